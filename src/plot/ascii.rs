//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - calibration points: `o`
//! - fitted curve: `-` line
//!
//! x = resistance (ohms), y = temperature (°C).

use crate::domain::{CalibrationPoint, FitFile, ModelParameters};
use crate::io::fit_file::PLOT_DOMAIN;
use crate::models::temperature;

/// Render a plot for an in-memory fit over the span of the data.
pub fn render_ascii_plot(
    points: &[CalibrationPoint],
    params: &ModelParameters,
    r25: f64,
    width: usize,
    height: usize,
) -> String {
    let (r_min, r_max) = resistance_range(points.iter().map(|p| p.resistance)).unwrap_or(PLOT_DOMAIN);
    let curve = sample_curve(params, r25, r_min, r_max, width.max(2));
    render_plot(points, &curve, r_min, r_max, width, height)
}

/// Render a plot from a saved fit JSON file (stored curve grid + points).
pub fn render_ascii_plot_from_fit_file(fit: &FitFile, width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = fit
        .grid
        .resistance_ohms
        .iter()
        .zip(fit.grid.temperature_c.iter())
        .map(|(&r, &t)| (r, t))
        .collect();
    let (r_min, r_max) = resistance_range(
        curve
            .iter()
            .map(|&(r, _)| r)
            .chain(fit.points.iter().map(|p| p.resistance)),
    )
    .unwrap_or(PLOT_DOMAIN);

    render_plot(&fit.points, &curve, r_min, r_max, width, height)
}

fn render_plot(
    points: &[CalibrationPoint],
    curve: &[(f64, f64)],
    r_min: f64,
    r_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = t_range(points, curve).unwrap_or((0.0, 1.0));
    let (t_min, t_max) = pad_range(t_min, t_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    draw_curve(&mut grid, curve, r_min, r_max, t_min, t_max);

    for p in points {
        let x = map_x(p.resistance, r_min, r_max, width);
        let y = map_y(p.temperature, t_min, t_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: R=[{r_min:.1}, {r_max:.1}] ohm | T=[{t_min:.2}, {t_max:.2}] C\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn resistance_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn sample_curve(params: &ModelParameters, r25: f64, r_min: f64, r_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .filter_map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let r = r_min + u * (r_max - r_min);
            temperature(r, params, r25).ok().map(|t| (r, t))
        })
        .collect()
}

fn t_range(points: &[CalibrationPoint], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;

    for p in points {
        min_t = min_t.min(p.temperature);
        max_t = max_t.max(p.temperature);
    }
    for &(_, t) in curve {
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }

    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(r: f64, r_min: f64, r_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((r - r_min) / (r_max - r_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(t: f64, t_min: f64, t_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    // Hottest at the top (row 0).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], r_min: f64, r_max: f64, t_min: f64, t_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(r, t) in curve {
        let x = map_x(r, r_min, r_max, width);
        let y = map_y(t, t_min, t_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, y, '-');
        } else {
            grid[y][x] = '-';
        }
        prev = Some((x, y));
    }
}

/// Integer line drawing (Bresenham-ish).
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
