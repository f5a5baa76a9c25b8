//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Density plot elements:
//! - total mixture density: `*`
//! - weighted component densities: `.`
//! - rug of raw samples (row under the plot): `|`
//!
//! Trend plot elements:
//! - setpoint (cumulative mean): `=`
//! - 95% band edges: `~`
//! - observed values: `o`

use crate::domain::{CumulativePoint, DensityCurve, FitFile};
use crate::math::finite_range;

/// Render the density of a fitted mixture with a rug of the fitted values.
pub fn render_density_plot(density: &DensityCurve, values: &[f64], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = finite_range(&density.x)
        .filter(|(lo, hi)| hi > lo)
        .unwrap_or((0.0, 1.0));
    let y_max = density
        .total
        .iter()
        .chain(density.components.iter().flatten())
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };

    let mut grid = vec![vec![' '; width]; height];

    // Total first so it stays visible where components overlap it.
    let total: Vec<(f64, f64)> = density.x.iter().copied().zip(density.total.iter().copied()).collect();
    draw_curve(&mut grid, &total, (x_min, x_max), (0.0, y_max), '*');
    for component in &density.components {
        let points: Vec<(f64, f64)> = density.x.iter().copied().zip(component.iter().copied()).collect();
        draw_curve(&mut grid, &points, (x_min, x_max), (0.0, y_max), '.');
    }

    let mut rug = vec![' '; width];
    for &v in values {
        if v >= x_min && v <= x_max {
            rug[map_x(v, x_min, x_max, width)] = '|';
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Density: x=[{x_min:.2}, {x_max:.2}] | peak={y_max:.4}\n"));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(&rug.into_iter().collect::<String>());
    out.push('\n');
    out
}

/// Render the density stored in a saved fit file (no refitting).
pub fn render_density_plot_from_fit_file(fit: &FitFile, width: usize, height: usize) -> String {
    render_density_plot(&fit.density, &fit.values, width, height)
}

/// Render observed values over their index with the rolling setpoint band.
pub fn render_trend_plot(
    values: &[f64],
    trend: &[Option<CumulativePoint>],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let n = values.len();
    let (x_min, x_max) = if n >= 2 { (0.0, (n - 1) as f64) } else { (0.0, 1.0) };
    let (y_min, y_max) = trend_y_range(values, trend).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let x_range = (x_min, x_max);
    let y_range = (y_min, y_max);

    let mut grid = vec![vec![' '; width]; height];

    let series = |f: fn(&CumulativePoint) -> f64| -> Vec<(f64, f64)> {
        trend
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.as_ref().map(f).unwrap_or(f64::NAN)))
            .collect()
    };
    draw_curve(&mut grid, &series(|p| p.mean), x_range, y_range, '=');
    draw_curve(&mut grid, &series(|p| p.upper), x_range, y_range, '~');
    draw_curve(&mut grid, &series(|p| p.lower), x_range, y_range, '~');

    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() {
            let x = map_x(i as f64, x_min, x_max, width);
            let y = map_y(v, y_min, y_max, height);
            grid[y][x] = 'o';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Trend: index=[0, {}] | y=[{y_min:.2}, {y_max:.2}]\n",
        n.max(1) - 1
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn trend_y_range(values: &[f64], trend: &[Option<CumulativePoint>]) -> Option<(f64, f64)> {
    let mut all: Vec<f64> = values.to_vec();
    for p in trend.iter().flatten() {
        all.extend([p.mean, p.lower, p.upper]);
    }
    let (lo, hi) = finite_range(&all)?;
    if hi > lo { Some((lo, hi)) } else { Some((lo - 1.0, hi + 1.0)) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Connect consecutive finite points; a non-finite point breaks the line.
fn draw_curve(
    grid: &mut [Vec<char>],
    points: &[(f64, f64)],
    (x_min, x_max): (f64, f64),
    (y_min, y_max): (f64, f64),
    ch: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let cx = map_x(x, x_min, x_max, width);
        let cy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, ch),
            None if grid[cy][cx] == ' ' => grid[cy][cx] = ch,
            None => {}
        }
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham-ish). Never overwrites a drawn cell.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
