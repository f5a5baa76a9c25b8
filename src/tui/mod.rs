//! Ratatui-based terminal UI.
//!
//! The TUI shows an editable comma-separated input line, the selected model's
//! density (or the cumulative setpoint band) and the candidate table. Presets
//! and seeds regenerate a synthetic series into the input line.
//!
//! A refit is never run inside the key handler: the request sets a "Fitting…"
//! status, the next loop iteration paints it, and only then the fit runs.

use std::io;
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::{RunOutput, fit_series};
use crate::data::{SampleData, generate_sample};
use crate::domain::{CollapsePolicy, RunConfig, WBC_DOMAIN};
use crate::error::AppError;
use crate::io::ingest::{Series, SeriesSource, parse_values};

mod plotters_chart;

use plotters_chart::{ChartSeries, MixtureChart, SeriesKind, finite_segments};

const DEBUG_DIR: &str = "debug";

const TOTAL_COLOR: RGBColor = RGBColor(0, 255, 255);
const COMPONENT_COLORS: [RGBColor; 3] = [RGBColor(255, 165, 0), RGBColor(255, 0, 255), RGBColor(0, 255, 0)];
const SAMPLE_COLOR: RGBColor = RGBColor(255, 255, 255);
const BAND_COLOR: RGBColor = RGBColor(255, 255, 0);

/// Start the TUI.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    // Build the initial state before touching the terminal so a bad
    // `--values` / `--file` is reported as a normal CLI error.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartView {
    Density,
    Trend,
}

struct App {
    config: RunConfig,
    input: String,
    editing: bool,
    /// The synthetic series currently shown in `input`, if unedited.
    sample: Option<SampleData>,
    pending_fit: bool,
    view: ChartView,
    status: String,
    run: Option<RunOutput>,
}

impl App {
    fn new(config: RunConfig) -> Result<Self, AppError> {
        let mut app = Self {
            config,
            input: String::new(),
            editing: false,
            sample: None,
            pending_fit: false,
            view: ChartView::Density,
            status: String::new(),
            run: None,
        };

        if let Some(path) = app.config.values_file.clone() {
            let series = crate::io::load_values(&path, &WBC_DOMAIN)?;
            app.input = join_values(&series.values);
        } else if let Some(values) = app.config.values.clone() {
            app.input = values;
        } else {
            app.regenerate()?;
        }
        app.request_fit();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            // The "Fitting…" frame is on screen now.
            if self.pending_fit {
                self.pending_fit = false;
                self.refit();
                needs_redraw = true;
                continue;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        if self.editing {
            self.handle_input_edit(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('e') | KeyCode::Char('i') => {
                self.editing = true;
                self.status = "Editing values. Enter to fit, Esc to stop editing.".to_string();
            }
            KeyCode::Enter => self.request_fit(),
            KeyCode::Char('p') => {
                self.config.preset = self.config.preset.next();
                self.regenerate()?;
                self.request_fit();
            }
            KeyCode::Char('r') => {
                self.config.seed = self.config.seed.wrapping_add(1);
                self.regenerate()?;
                self.request_fit();
            }
            KeyCode::Char('+') | KeyCode::Right => {
                self.config.sample_count = self.config.sample_count.saturating_add(5);
                self.regenerate()?;
                self.request_fit();
            }
            KeyCode::Char('-') | KeyCode::Left => {
                self.config.sample_count = self.config.sample_count.saturating_sub(5).max(5);
                self.regenerate()?;
                self.request_fit();
            }
            KeyCode::Char('c') => {
                self.config.collapse = match self.config.collapse {
                    CollapsePolicy::Propagate => CollapsePolicy::Reseed,
                    CollapsePolicy::Reseed => CollapsePolicy::Propagate,
                };
                self.request_fit();
            }
            KeyCode::Char('t') | KeyCode::Tab => {
                self.view = match self.view {
                    ChartView::Density => ChartView::Trend,
                    ChartView::Trend => ChartView::Density,
                };
            }
            KeyCode::Char('d') => self.write_debug(),
            _ => {}
        }

        Ok(false)
    }

    fn handle_input_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing = false;
                self.status = "Stopped editing.".to_string();
            }
            KeyCode::Enter => {
                self.editing = false;
                self.request_fit();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || matches!(c, '.' | ',' | ' ' | '-' | 'e' | 'E') {
                    self.input.push(c);
                }
            }
            _ => {}
        }
    }

    /// Replace the input line with a fresh synthetic series.
    fn regenerate(&mut self) -> Result<(), AppError> {
        let sample = generate_sample(&self.config)?;
        self.input = join_values(&sample.values);
        self.sample = Some(sample);
        Ok(())
    }

    fn request_fit(&mut self) {
        self.pending_fit = true;
        self.status = "Fitting…".to_string();
    }

    fn refit(&mut self) {
        let values = match parse_values(&self.input, &WBC_DOMAIN) {
            Ok(values) => values,
            Err(err) => {
                self.status = err.message().to_string();
                return;
            }
        };

        // An unedited synthetic series keeps its provenance.
        let sample = self.sample.clone().filter(|s| s.values == values);
        let source = match &sample {
            Some(s) => SeriesSource::Synthetic {
                preset: s.preset.display_name().to_string(),
                seed: s.seed,
            },
            None => SeriesSource::Input,
        };
        let series = match Series::new(values, source) {
            Ok(series) => series,
            Err(err) => {
                self.status = err.message().to_string();
                return;
            }
        };

        let run = fit_series(series, sample, &self.config);
        self.status = format!(
            "Fitted n={} -> k={} ({:?})",
            run.series.values.len(),
            run.selection.best.model.component_count,
            run.selection.outcome
        );
        self.run = Some(run);
    }

    fn write_debug(&mut self) {
        let Some(run) = &self.run else {
            self.status = "Nothing fitted yet.".to_string();
            return;
        };
        self.status = match crate::debug::write_debug_bundle(Path::new(DEBUG_DIR), &run.series, self.config.collapse) {
            Ok(path) => format!("Wrote debug bundle: {}", path.display()),
            Err(err) => format!("Debug write failed: {err}"),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("setpoint", Style::default().fg(Color::Cyan)),
            Span::raw(" - WBC Gaussian mixture fit"),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "preset: {} | count: {} | seed: {} | collapse: {:?}",
                self.config.preset.display_name(),
                self.config.sample_count,
                self.config.seed,
                self.config.collapse,
            ),
            Style::default().fg(Color::Gray),
        )));

        let input_style = if self.editing {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if self.editing { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled("values: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{}{cursor}", self.input), input_style),
        ]));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(52)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_candidates(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match self.view {
            ChartView::Density => "Mixture density",
            ChartView::Trend => "Setpoint trend (95% band)",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(run) = &self.run else {
            let msg = Paragraph::new("Waiting for a fit...").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let prepared = match self.view {
            ChartView::Density => density_series(run),
            ChartView::Trend => trend_series(run),
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = MixtureChart {
            series: &prepared.series,
            x_bounds: prepared.x_bounds,
            y_bounds: prepared.y_bounds,
            x_label: prepared.x_label,
            y_label: prepared.y_label,
            fmt_x: fmt_axis_x,
            fmt_y: prepared.fmt_y,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &prepared);
        }
    }

    fn draw_candidates(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let text = match &self.run {
            Some(run) => {
                let mut text = crate::report::format_candidates(&run.selection);
                text.push('\n');
                text.push_str(run.selection.outcome.label());
                text.push('\n');
                if let Some(p) = crate::report::latest_trend_point(&run.trend) {
                    text.push_str(&format!(
                        "\nlatest setpoint: {:.2}\nband: {:.2} .. {:.2}\n",
                        p.mean, p.lower, p.upper
                    ));
                }
                text
            }
            None => String::new(),
        };
        let p = Paragraph::new(text).block(Block::default().title("Candidates").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if self.editing {
            "type values  Backspace delete  Enter fit  Esc done"
        } else {
            "e edit  Enter fit  p preset  r reseed  +/- count  c collapse  t chart  d debug  q quit"
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.1}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything the chart widget and the tick labels need.
struct PreparedChart {
    series: Vec<ChartSeries>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    x_label: &'static str,
    y_label: &'static str,
    fmt_y: fn(f64) -> String,
}

/// Total density (filled), weighted components and a rug of the samples.
fn density_series(run: &RunOutput) -> PreparedChart {
    let d = &run.density;
    let x_bounds = bounds_or(&d.x, [0.0, 1.0]);

    let mut series = Vec::new();
    let total: Vec<(f64, f64)> = d.x.iter().copied().zip(d.total.iter().copied()).collect();
    for seg in finite_segments(&total) {
        series.push(ChartSeries::new(seg, TOTAL_COLOR, SeriesKind::Area));
    }
    for (j, comp) in d.components.iter().enumerate() {
        let pts: Vec<(f64, f64)> = d.x.iter().copied().zip(comp.iter().copied()).collect();
        let color = COMPONENT_COLORS[j % COMPONENT_COLORS.len()];
        for seg in finite_segments(&pts) {
            series.push(ChartSeries::new(seg, color, SeriesKind::Line));
        }
    }

    let peak = d
        .total
        .iter()
        .chain(d.components.iter().flatten())
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let y_max = if peak > 0.0 { peak * 1.05 } else { 1.0 };

    let rug: Vec<(f64, f64)> = run.series.values.iter().map(|&v| (v, 0.0)).collect();
    series.push(ChartSeries::new(rug, SAMPLE_COLOR, SeriesKind::Dots));

    PreparedChart {
        series,
        x_bounds,
        y_bounds: [0.0, y_max],
        x_label: "WBC (10^9/L)",
        y_label: "density",
        fmt_y: fmt_axis_y_density,
    }
}

/// Observed values over index, the rolling setpoint and its band edges.
fn trend_series(run: &RunOutput) -> PreparedChart {
    let values = &run.series.values;
    let n = values.len();
    let x_bounds = if n >= 2 { [0.0, (n - 1) as f64] } else { [0.0, 1.0] };

    let pick = |f: fn(&crate::domain::CumulativePoint) -> f64| -> Vec<(f64, f64)> {
        run.trend
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.as_ref().map(f).unwrap_or(f64::NAN)))
            .collect()
    };

    let mut series = Vec::new();
    for seg in finite_segments(&pick(|p| p.lower)) {
        series.push(ChartSeries::new(seg, BAND_COLOR, SeriesKind::Line));
    }
    for seg in finite_segments(&pick(|p| p.upper)) {
        series.push(ChartSeries::new(seg, BAND_COLOR, SeriesKind::Line));
    }
    for seg in finite_segments(&pick(|p| p.mean)) {
        series.push(ChartSeries::new(seg, TOTAL_COLOR, SeriesKind::Line));
    }
    let observed: Vec<(f64, f64)> = values.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect();

    let mut ys: Vec<f64> = values.clone();
    for s in &series {
        ys.extend(s.points.iter().map(|&(_, y)| y));
    }
    series.push(ChartSeries::new(observed, SAMPLE_COLOR, SeriesKind::Dots));

    let [y_min, y_max] = bounds_or(&ys, [0.0, 1.0]);
    let pad = ((y_max - y_min).abs() * 0.05).max(0.5);

    PreparedChart {
        series,
        x_bounds,
        y_bounds: [(y_min - pad).max(0.0), y_max + pad],
        x_label: "measurement #",
        y_label: "WBC",
        fmt_y: fmt_axis_y_value,
    }
}

fn bounds_or(values: &[f64], fallback: [f64; 2]) -> [f64; 2] {
    match crate::math::finite_range(values) {
        Some((lo, hi)) if hi > lo => [lo, hi],
        Some((lo, hi)) => [lo - 1.0, hi + 1.0],
        None => fallback,
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.1}")
}

fn fmt_axis_y_density(v: f64) -> String {
    format!("{v:.3}")
}

fn fmt_axis_y_value(v: f64) -> String {
    format!("{v:.1}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    prepared: &PreparedChart,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = prepared.x_bounds;
    let [y0, y1] = prepared.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_x(x0 + u * (x1 - x0));
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = (prepared.fmt_y)(y0 + u * (y1 - y0));
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(prepared.x_label)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(prepared.y_label)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(values: &str) -> RunConfig {
        RunConfig {
            values: Some(values.to_string()),
            ..RunConfig::default()
        }
    }

    #[test]
    fn fit_is_deferred_until_the_next_tick() {
        let mut app = App::new(config_with("6.0, 6.2, 5.9, 6.1, 6.3")).unwrap();
        assert!(app.pending_fit);
        assert_eq!(app.status, "Fitting…");
        assert!(app.run.is_none());

        app.refit();
        assert!(app.run.is_some());
        assert!(app.status.starts_with("Fitted n=5"));
    }

    #[test]
    fn invalid_input_keeps_previous_fit_and_reports() {
        let mut app = App::new(config_with("6.0, 6.2, 5.9")).unwrap();
        app.refit();
        assert!(app.run.is_some());

        app.input = "6.0, 150".to_string();
        app.refit();
        assert!(app.status.contains("Value 2"), "{}", app.status);
        assert_eq!(app.run.as_ref().unwrap().series.values.len(), 3);
    }

    #[test]
    fn preset_key_regenerates_input() {
        let mut app = App::new(RunConfig::default()).unwrap();
        let before = app.input.clone();
        app.pending_fit = false;
        app.handle_key(KeyCode::Char('p')).unwrap();
        assert!(app.pending_fit);
        assert_ne!(app.input, before);

        app.refit();
        let run = app.run.as_ref().unwrap();
        assert!(matches!(run.series.source, SeriesSource::Synthetic { .. }));
    }

    #[test]
    fn edited_synthetic_input_becomes_user_input() {
        let mut app = App::new(RunConfig::default()).unwrap();
        app.handle_key(KeyCode::Char('e')).unwrap();
        app.handle_key(KeyCode::Char(',')).unwrap();
        app.handle_key(KeyCode::Char('7')).unwrap();
        app.handle_key(KeyCode::Enter).unwrap();
        assert!(!app.editing);
        app.refit();
        assert_eq!(app.run.as_ref().unwrap().series.source, SeriesSource::Input);
    }

    #[test]
    fn chart_series_skip_gaps() {
        let mut app = App::new(config_with("6.0, 6.2, 5.9, 6.1")).unwrap();
        app.refit();
        let run = app.run.as_ref().unwrap();
        let trend = trend_series(run);
        // lower, upper, mean (one segment each for indices 2..=3) + observations
        assert_eq!(trend.series.len(), 4);
        assert!(trend.series.iter().all(|s| s.points.iter().all(|p| p.1.is_finite())));
        let density = density_series(run);
        assert_eq!(density.series.last().unwrap().points.len(), 4);
        assert_eq!(density.y_bounds[0], 0.0);
    }
}
