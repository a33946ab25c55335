use crate::domain::model::{Algorithm, MarkerShape};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

pub const MARKER_SIZE: i32 = 5;

/// Default colour cycle for series that are not algorithms (weights, agent positions).
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

pub fn palette(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

pub fn algorithm_color(algorithm: Algorithm) -> RGBColor {
    let (r, g, b) = algorithm.rgb();
    RGBColor(r, g, b)
}

pub fn padded_range(min: f64, max: f64) -> std::ops::Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

pub type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Draws `points` with the given marker shape.
pub fn draw_markers(
    chart: &mut Chart<'_, '_>,
    points: &[(f64, f64)],
    shape: MarkerShape,
    color: RGBColor,
) -> Result<(), String> {
    let s = MARKER_SIZE;
    let filled = color.filled();
    let stroke = color.stroke_width(2);
    let pts = points.iter().copied();

    let result = match shape {
        MarkerShape::Circle => {
            chart.draw_series(pts.map(|p| Circle::new(p, s, filled)))
        }
        MarkerShape::Square => chart.draw_series(
            pts.map(|p| EmptyElement::at(p) + Rectangle::new([(-s, -s), (s, s)], filled)),
        ),
        MarkerShape::Diamond => chart.draw_series(pts.map(|p| {
            EmptyElement::at(p) + Polygon::new(vec![(0, -s - 1), (s, 0), (0, s + 1), (-s, 0)], filled)
        })),
        MarkerShape::Plus => chart.draw_series(pts.map(|p| {
            EmptyElement::at(p)
                + PathElement::new(vec![(-s, 0), (s, 0)], stroke)
                + PathElement::new(vec![(0, -s), (0, s)], stroke)
        })),
        MarkerShape::Cross => chart.draw_series(pts.map(|p| Cross::new(p, s, stroke))),
        MarkerShape::Hexagon => chart.draw_series(pts.map(|p| {
            let h = s / 2;
            EmptyElement::at(p)
                + Polygon::new(
                    vec![(-h, -s), (h, -s), (s, 0), (h, s), (-h, s), (-s, 0)],
                    filled,
                )
        })),
    };

    result.map(|_| ()).map_err(|e| e.to_string())
}
