use crate::utils::error::{AnalysisError, Result};
use plotters::prelude::*;
use std::path::Path;

/// Share of each category slot covered by bars.
const GROUP_WIDTH: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct BarSeriesSpec {
    pub label: String,
    /// One value per category.
    pub values: Vec<f64>,
    pub color: RGBColor,
}

/// Grouped bar chart: `categories` along x, one bar per series in each category.
#[derive(Debug, Clone)]
pub struct BarChartSpec {
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<BarSeriesSpec>,
}

impl BarChartSpec {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            x_label: None,
            y_label: None,
            categories,
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x_label: Option<&str>, y_label: Option<&str>) -> Self {
        self.x_label = x_label.map(str::to_string);
        self.y_label = y_label.map(str::to_string);
        self
    }

    pub fn push(&mut self, series: BarSeriesSpec) {
        self.series.push(series);
    }

    /// `[x0, x1]` of the bar for `series` in `category`.
    pub fn bar_span(&self, category: usize, series: usize) -> (f64, f64) {
        let width = GROUP_WIDTH / self.series.len().max(1) as f64;
        let x0 = category as f64 - GROUP_WIDTH / 2.0 + width * series as f64;
        (x0, x0 + width)
    }

    fn value_range(&self) -> (f64, f64) {
        let (min, max) = self
            .series
            .iter()
            .flat_map(|s| s.values.iter())
            .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let max = if max <= 0.0 && min >= 0.0 { 1.0 } else { max };
        (min * 1.1, max * 1.1)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for series in &self.series {
            if series.values.len() != self.categories.len() {
                return Err(format!(
                    "series '{}' has {} values for {} categories",
                    series.label,
                    series.values.len(),
                    self.categories.len()
                ));
            }
        }
        Ok(())
    }
}

/// Renders a grouped bar chart to a PNG file.
pub fn draw_bar_chart(path: &Path, size: (u32, u32), spec: &BarChartSpec) -> Result<()> {
    let chart_name = path.display().to_string();
    let err = |e: &dyn std::fmt::Display| AnalysisError::plot(chart_name.clone(), e);
    spec.validate().map_err(|e| err(&e))?;

    if spec.categories.is_empty() || spec.series.is_empty() {
        tracing::warn!("⚠️ No data for {}, chart skipped", chart_name);
        return Ok(());
    }

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| err(&e))?;

    let n = spec.categories.len();
    let (y_min, y_max) = spec.value_range();
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
        .map_err(|e| err(&e))?;

    let categories = &spec.categories;
    let tick_label = |x: &f64| {
        let rounded = x.round();
        if (x - rounded).abs() < 1e-6 && rounded >= 0.0 && (rounded as usize) < n {
            categories[rounded as usize].clone()
        } else {
            String::new()
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&tick_label)
        .label_style(("sans-serif", 20))
        .axis_desc_style(("sans-serif", 24));
    if let Some(x_label) = &spec.x_label {
        mesh.x_desc(x_label.as_str());
    }
    if let Some(y_label) = &spec.y_label {
        mesh.y_desc(y_label.as_str());
    }
    mesh.draw().map_err(|e| err(&e))?;

    for (s, series) in spec.series.iter().enumerate() {
        let color = series.color;
        chart
            .draw_series(series.values.iter().enumerate().map(|(c, &v)| {
                let (x0, x1) = spec.bar_span(c, s);
                Rectangle::new([(x0, 0.0), (x1, v)], color.filled())
            }))
            .map_err(|e| err(&e))?
            .label(series.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", 18))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| err(&e))?;

    root.present().map_err(|e| err(&e))?;
    tracing::debug!("Saved bar chart {}", chart_name);
    Ok(())
}
