//! Plotters-powered mixture/trend chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// How a series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Connected line.
    Line,
    /// Line filled down to zero.
    Area,
    /// Individual dots (observations, rug).
    Dots,
}

/// One drawable series. Points must be finite; split at gaps beforehand
/// with [`finite_segments`].
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub kind: SeriesKind,
}

impl ChartSeries {
    pub fn new(points: Vec<(f64, f64)>, color: RGBColor, kind: SeriesKind) -> Self {
        Self { points, color, kind }
    }
}

/// Split a series at non-finite points into runs of finite points.
pub fn finite_segments(points: &[(f64, f64)]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in points {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call, which keeps
/// `render()` focused on drawing.
pub struct MixtureChart<'a> {
    pub series: &'a [ChartSeries],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for MixtureChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are clutter at terminal resolution; axes + labels suffice.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for s in self.series {
                match s.kind {
                    SeriesKind::Line => {
                        chart.draw_series(LineSeries::new(s.points.iter().copied(), &s.color))?;
                    }
                    SeriesKind::Area => {
                        chart.draw_series(
                            AreaSeries::new(s.points.iter().copied(), 0.0, s.color.mix(0.2))
                                .border_style(&s.color),
                        )?;
                    }
                    SeriesKind::Dots => {
                        // `Circle` radii are mis-scaled by the ratatui backend; a
                        // `Pixel` renders as a clean dot.
                        chart.draw_series(s.points.iter().map(|&(x, y)| Pixel::new((x, y), s.color)))?;
                    }
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_split_on_gaps() {
        let pts = [
            (0.0, f64::NAN),
            (1.0, 1.0),
            (2.0, 2.0),
            (3.0, f64::NAN),
            (4.0, 4.0),
        ];
        let segs = finite_segments(&pts);
        assert_eq!(segs, vec![vec![(1.0, 1.0), (2.0, 2.0)], vec![(4.0, 4.0)]]);
        assert!(finite_segments(&[(0.0, f64::INFINITY)]).is_empty());
    }

    fn chart(series: &[ChartSeries]) -> MixtureChart<'_> {
        MixtureChart {
            series,
            x_bounds: [0.0, 10.0],
            y_bounds: [0.0, 1.0],
            x_label: "WBC",
            y_label: "density",
            fmt_x: |v| format!("{v:.0}"),
            fmt_y: |v| format!("{v:.1}"),
        }
    }

    #[test]
    fn renders_every_series_kind() {
        let points = vec![(1.0, 0.1), (5.0, 0.8), (9.0, 0.1)];
        let series = [
            ChartSeries::new(points.clone(), RED, SeriesKind::Area),
            ChartSeries::new(points.clone(), BLUE, SeriesKind::Line),
            ChartSeries::new(points, WHITE, SeriesKind::Dots),
        ];
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        chart(&series).render(area, &mut buf);

        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(!text.contains("too small"));
    }

    #[test]
    fn tiny_area_shows_a_hint() {
        let area = Rect::new(0, 0, 40, 4);
        let mut buf = Buffer::empty(area);
        chart(&[]).render(area, &mut buf);

        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Chart area too small"));
    }
}
