use anyhow::{anyhow, Context, Result};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::Recording;

const PLOT_SIZE: (u32, u32) = (1200, 500);

/// Shortest round-trip rendering with a decimal point on whole values (`5.0`, `2.5`),
/// switching to a signed two-digit exponent below 1e-4 and from 1e16 (`1e-05`, `1e+16`).
pub fn format_minutes(minutes: f64) -> String {
    if !minutes.is_finite() {
        return format!("{}", minutes);
    }

    let magnitude = minutes.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", minutes);
        if let Some((mantissa, exp)) = sci.split_once('e') {
            if let Ok(exp) = exp.parse::<i32>() {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.abs());
            }
        }
        return sci;
    }

    let plain = format!("{}", minutes);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

pub fn plot_title(subject: u32, minutes: f64, sample_rate: u32) -> String {
    format!(
        "Subject {} \u{2014} last {} min (Fs={} Hz)",
        subject,
        format_minutes(minutes),
        sample_rate
    )
}

/// One-line console summary of what was loaded and shown.
pub fn summary_line(subject: u32, total_secs: f64, minutes: f64) -> String {
    format!(
        "Loaded Subject {}: {:.1} s total, showing {} min.",
        subject,
        total_secs,
        format_minutes(minutes)
    )
}

/// Axis ranges covering the finite points, padded when degenerate.
fn axis_ranges(recording: &Recording) -> ((f64, f64), (f64, f64)) {
    let x_end = recording.time.last().copied().unwrap_or(0.0);
    let x_range = if x_end > 0.0 { (0.0, x_end) } else { (0.0, 1.0) };

    let (lo, hi) = recording
        .samples
        .iter()
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| {
            (lo.min(y as f64), hi.max(y as f64))
        });
    let y_range = if !lo.is_finite() {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    };

    (x_range, y_range)
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    recording: &Recording,
    title: &str,
) -> Result<()> {
    let ((x0, x1), (y0, y1)) = axis_ranges(recording);

    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to clear plot: {}", e))?;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| anyhow!("Failed to build chart: {}", e))?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("ECG (norm)")
        .draw()
        .map_err(|e| anyhow!("Failed to draw axes: {}", e))?;

    chart
        .draw_series(LineSeries::new(
            recording
                .time
                .iter()
                .zip(&recording.samples)
                .filter(|(_, y)| y.is_finite())
                .map(|(&t, &y)| (t, y as f64)),
            BLUE.stroke_width(1),
        ))
        .map_err(|e| anyhow!("Failed to draw series: {}", e))?;

    root.present()
        .map_err(|e| anyhow!("Failed to write plot: {}", e))?;
    Ok(())
}

/// Plot a normalized ECG trace against time. `.svg` paths render SVG, anything else PNG.
pub fn plot_time(recording: &Recording, title: &str, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    debug!(
        "Plotting {} samples to {}",
        recording.len(),
        path.display()
    );

    let is_svg = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
        draw_chart(&root, recording, title)
    } else {
        let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
        draw_chart(&root, recording, title)
    }
}
