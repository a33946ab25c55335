use crate::domain::model::MarkerShape;
use crate::render::style::{draw_markers, padded_range};
use crate::utils::error::{AnalysisError, Result};
use plotters::prelude::*;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LineSeriesSpec {
    /// Series without a label are drawn but left out of the legend.
    pub label: Option<String>,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub marker: MarkerShape,
    pub dashed: bool,
}

#[derive(Debug, Clone)]
pub struct LineChartSpec {
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<LineSeriesSpec>,
}

impl LineChartSpec {
    pub fn new(x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
        }
    }

    pub fn push(&mut self, series: LineSeriesSpec) {
        self.series.push(series);
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let points = self.series.iter().flat_map(|s| s.points.iter());
        points.fold(
            (
                (f64::INFINITY, f64::NEG_INFINITY),
                (f64::INFINITY, f64::NEG_INFINITY),
            ),
            |((x0, x1), (y0, y1)), &(x, y)| ((x0.min(x), x1.max(x)), (y0.min(y), y1.max(y))),
        )
    }
}

/// Renders a multi-series line chart with markers to a PNG file.
pub fn draw_line_chart(path: &Path, size: (u32, u32), spec: &LineChartSpec) -> Result<()> {
    let chart_name = path.display().to_string();
    if spec.is_empty() {
        tracing::warn!("⚠️ No data for {}, chart skipped", chart_name);
        return Ok(());
    }
    let err = |e: &dyn std::fmt::Display| AnalysisError::plot(chart_name.clone(), e);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(&e))?;

    let ((x_min, x_max), (y_min, y_max)) = spec.bounds();
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(padded_range(x_min, x_max), padded_range(y_min, y_max))
        .map_err(|e| err(&e))?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .label_style(("sans-serif", 20))
        .axis_desc_style(("sans-serif", 24))
        .draw()
        .map_err(|e| err(&e))?;

    for series in &spec.series {
        if series.points.is_empty() {
            continue;
        }
        let color = series.color;
        let style = color.stroke_width(2);

        let anno = if series.dashed {
            chart.draw_series(DashedLineSeries::new(series.points.iter().copied(), 8, 6, style))
        } else {
            chart.draw_series(LineSeries::new(series.points.iter().copied(), style))
        }
        .map_err(|e| err(&e))?;

        if let Some(label) = &series.label {
            let dashed = series.dashed;
            anno.label(label.as_str()).legend(move |(x, y)| {
                let end = if dashed { x + 8 } else { x + 20 };
                PathElement::new(vec![(x, y), (end, y)], color.stroke_width(2))
            });
        }

        draw_markers(&mut chart, &series.points, series.marker, color).map_err(|e| err(&e))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .label_font(("sans-serif", 18))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| err(&e))?;

    root.present().map_err(|e| err(&e))?;
    tracing::debug!("Saved line chart {}", chart_name);
    Ok(())
}
