//! Diagnostic plots of alignment quality.
//!
//! [`plot_diagnostics`] renders a single PNG with three panels:
//! - Histogram of pooled log-MSE values, coloured by mixture class
//! - Histogram of timing errors between matched pulse intervals
//! - Scatter of A pulse times against their corresponding B times
//!
//! Plotting never changes the aligner; it is purely a debugging aid.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::DiagnosticsConfig;
use crate::processors::aligner::Aligner;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("No corresponding pulses to plot")]
    NothingToPlot,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Match histogram color (blue).
const MATCH_COLOR: RGBColor = RGBColor(55, 126, 184);

/// Non-match histogram color (red).
const NON_MATCH_COLOR: RGBColor = RGBColor(228, 26, 28);

/// Values plotted by [`plot_diagnostics`].
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSeries {
    /// Pooled log-MSE values assigned to the match component.
    pub log_mse_match: Vec<f64>,
    /// Pooled log-MSE values assigned to the non-match component.
    pub log_mse_non_match: Vec<f64>,
    /// `diff(cor_times_a) - diff(pulse_times_b)` over matched neighbours.
    pub timing_errors: Vec<f64>,
    /// `(pulse_time_a, corresponding_time_b)` for every matched A pulse.
    pub correspondence: Vec<(f64, f64)>,
}

impl DiagnosticSeries {
    /// Collect the plotted series from an aligner.
    pub fn from_aligner(aligner: &Aligner) -> Self {
        let classification = aligner.classification();
        let (log_mse_match, log_mse_non_match) = classification
            .pooled_log_mse
            .iter()
            .partition(|&&v| classification.is_match_value(v));

        let correspondence = aligner
            .pulse_times_a()
            .iter()
            .zip(aligner.cor_times_b())
            .filter_map(|(&a, b)| b.map(|b| (a, b)))
            .collect();

        Self {
            log_mse_match,
            log_mse_non_match,
            timing_errors: aligner.timing_errors(),
            correspondence,
        }
    }
}

/// Count `values` into `bins` equal-width bins spanning `[lo, hi]`.
///
/// Values outside the range or non-finite are ignored; `hi` falls in the
/// last bin.
pub fn histogram(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    if bins == 0 || lo.is_nan() || hi.is_nan() || hi <= lo {
        return counts;
    }
    let width = (hi - lo) / bins as f64;
    for &v in values {
        if !v.is_finite() || v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Finite min/max over several series, widened when degenerate.
fn value_range<'a, I>(series: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for values in series {
        for &v in values.iter().filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo > hi {
        return None;
    }
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    Some((lo, hi))
}

fn plot_err<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

/// Draw overlaid histograms of several series on one panel.
fn draw_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    groups: &[(&[f64], RGBColor)],
    bins: usize,
    x_desc: &str,
) -> Result<()> {
    let Some((lo, hi)) = value_range(groups.iter().map(|(values, _)| *values)) else {
        return Ok(());
    };
    let bins = bins.max(1);
    let width = (hi - lo) / bins as f64;

    let counts: Vec<Vec<usize>> = groups
        .iter()
        .map(|(values, _)| histogram(values, lo, hi, bins))
        .collect();
    let max_count = counts.iter().flatten().copied().max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(40)
        .build_cartesian_2d(lo..hi, 0.0..(max_count as f64 * 1.1))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(x_desc)
        .draw()
        .map_err(plot_err)?;

    for ((_, color), group_counts) in groups.iter().zip(&counts) {
        chart
            .draw_series(group_counts.iter().enumerate().filter(|&(_, &c)| c > 0).map(
                |(i, &c)| {
                    let x0 = lo + i as f64 * width;
                    Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], color.mix(0.6).filled())
                },
            ))
            .map_err(plot_err)?;
    }

    Ok(())
}

/// Draw A pulse times against their corresponding B times.
fn draw_correspondence<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    points: &[(f64, f64)],
) -> Result<()> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    let (Some((x_min, x_max)), Some((y_min, y_max))) =
        (value_range([xs.as_slice()]), value_range([ys.as_slice()]))
    else {
        return Err(VisualizationError::NothingToPlot);
    };
    let y_padding = (y_max - y_min) * 0.05;

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, (y_min - y_padding)..(y_max + y_padding))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("pulse times A")
        .y_desc("pulse times B")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 2, MATCH_COLOR.filled())),
        )
        .map_err(plot_err)?;

    Ok(())
}

/// Render the three diagnostic panels for `aligner` to a PNG file.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `aligner` - The aligner to visualize
/// * `config` - Image size and histogram bin count
///
/// # Errors
///
/// Returns [`VisualizationError::NothingToPlot`] if no pulses were matched,
/// or a plotting error if the image cannot be rendered or written.
pub fn plot_diagnostics(
    output_path: &Path,
    aligner: &Aligner,
    config: &DiagnosticsConfig,
) -> Result<()> {
    let series = DiagnosticSeries::from_aligner(aligner);
    if series.correspondence.is_empty() {
        return Err(VisualizationError::NothingToPlot);
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let root = BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (top, bottom) = root.split_vertically(config.height / 3);
    let (mse_area, error_area) = top.split_horizontally(config.width * 2 / 3);

    draw_histogram(
        &mse_area,
        &[
            (series.log_mse_match.as_slice(), MATCH_COLOR),
            (series.log_mse_non_match.as_slice(), NON_MATCH_COLOR),
        ],
        config.bins,
        "Log mean squared error",
    )?;
    draw_histogram(
        &error_area,
        &[(series.timing_errors.as_slice(), MATCH_COLOR)],
        config.bins,
        "Δt",
    )?;
    draw_correspondence(&bottom, &series.correspondence)?;

    root.present().map_err(plot_err)?;
    log::info!("Diagnostics -> {}", output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::aligner::make_aligner;

    #[test]
    fn test_histogram_counts() {
        let values = vec![0.0, 0.1, 0.5, 0.99, 1.0, 2.0, f64::NAN];
        let counts = histogram(&values, 0.0, 1.0, 2);
        assert_eq!(counts, vec![2, 3]);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        assert_eq!(histogram(&[1.0, 1.0], 1.0, 1.0, 3), vec![0, 0, 0]);
        assert!(histogram(&[1.0], 0.0, 2.0, 0).is_empty());
    }

    #[test]
    fn test_value_range() {
        let a = [3.0, -1.0, f64::INFINITY];
        let b = [10.0];
        assert_eq!(value_range([&a[..], &b[..]]), Some((-1.0, 10.0)));
        assert_eq!(value_range([&[5.0][..]]), Some((4.0, 6.0)));
        assert_eq!(value_range([&[f64::NAN][..]]), None);
    }

    #[test]
    fn test_diagnostic_series_identity() {
        let mut t = 0.0;
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let a: Vec<f64> = (0..100)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                t += 100.0 + ((state >> 33) % 1800) as f64;
                t
            })
            .collect();
        let aligner = make_aligner(&a, &a, 5).unwrap();
        let series = DiagnosticSeries::from_aligner(&aligner);

        assert_eq!(series.correspondence.len(), aligner.summary().matched_pulses_a);
        assert!(series.correspondence.iter().all(|(x, y)| x == y));
        assert!(series.timing_errors.iter().all(|e| e.abs() < 1e-9));
        assert_eq!(
            series.log_mse_match.len() + series.log_mse_non_match.len(),
            aligner.classification().pooled_log_mse.len()
        );
    }
}
