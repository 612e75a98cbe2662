//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a calibration:
//! - coefficients, SSE, verdict and threshold
//! - the calibration points and their residuals
//! - a precomputed curve grid for quick plotting
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;
use log::info;

use crate::domain::{CalibrationPoint, CurveGrid, FitFile, FitResult, ModelParameters};
use crate::error::AppError;
use crate::models::temperature;

/// Default resistance span (ohms) of the plotted curve.
pub const PLOT_DOMAIN: (f64, f64) = (475.0, 23_000.0);

/// Resistance stride (ohms) of the saved curve grid: 475, 675, ..., 22875.
pub const GRID_STEP_OHMS: f64 = 200.0;

/// Assemble the saved representation of a fit.
pub fn build_fit_file(result: &FitResult, points: &[CalibrationPoint], r25: f64) -> FitFile {
    let (r_min, r_max) = points.iter().fold(PLOT_DOMAIN, |(lo, hi), p| {
        (lo.min(p.resistance), hi.max(p.resistance))
    });

    FitFile {
        tool: "shfit".to_string(),
        generated_at: Utc::now(),
        r25,
        params: result.params,
        sse: result.sse,
        sse_threshold: result.sse_threshold,
        verdict: result.verdict,
        points: points.to_vec(),
        residuals: result.residuals.clone(),
        grid: build_grid(&result.params, r25, r_min, r_max, GRID_STEP_OHMS),
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(
    path: &Path,
    result: &FitResult,
    points: &[CalibrationPoint],
    r25: f64,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &build_fit_file(result, points, r25))
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    info!("wrote fit to {}", path.display());
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

/// Sample the fitted curve at `r_min, r_min + step, ...` up to (excluding) `r_max`.
///
/// Samples where the model is undefined are dropped.
pub fn build_grid(params: &ModelParameters, r25: f64, r_min: f64, r_max: f64, step: f64) -> CurveGrid {
    let mut resistance_ohms = Vec::new();
    let mut temperature_c = Vec::new();
    if !(step > 0.0 && r_max > r_min) {
        return CurveGrid {
            resistance_ohms,
            temperature_c,
        };
    }

    let n = ((r_max - r_min) / step).ceil() as usize;
    for i in 0..n {
        let r = r_min + i as f64 * step;
        if let Ok(t) = temperature(r, params, r25) {
            resistance_ohms.push(r);
            temperature_c.push(t);
        }
    }

    CurveGrid {
        resistance_ohms,
        temperature_c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_R25, FitQuality};

    fn sample_result() -> FitResult {
        FitResult {
            params: ModelParameters::NOMINAL,
            residuals: vec![0.01, -0.02, 0.0, 0.005],
            sse: 0.000525,
            verdict: FitQuality::Acceptable,
            sse_threshold: 0.02,
            covariance: None,
            iterations: 5,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn grid_uses_a_fixed_stride_over_the_plot_domain() {
        let points = vec![
            CalibrationPoint::new(1_000.0, 60.0),
            CalibrationPoint::new(10_000.0, 25.0),
        ];
        let grid = build_fit_file(&sample_result(), &points, DEFAULT_R25).grid;

        assert_eq!(grid.resistance_ohms.len(), 113);
        assert_eq!(grid.resistance_ohms.first().copied(), Some(475.0));
        assert_eq!(grid.resistance_ohms[1], 675.0);
        assert_eq!(grid.resistance_ohms.last().copied(), Some(22_875.0));
        assert_eq!(grid.resistance_ohms.len(), grid.temperature_c.len());
    }

    #[test]
    fn grid_widens_to_cover_the_data() {
        let points = vec![
            CalibrationPoint::new(300.0, 90.0),
            CalibrationPoint::new(30_000.0, 0.0),
        ];
        let grid = build_fit_file(&sample_result(), &points, DEFAULT_R25).grid;

        assert_eq!(grid.resistance_ohms.first().copied(), Some(300.0));
        assert_eq!(grid.resistance_ohms.last().copied(), Some(29_900.0));
    }

    #[test]
    fn undefined_samples_are_dropped() {
        // Denominator a0 + a1·L vanishes at L = 0 (R = R25).
        let params = ModelParameters::new(0.0, 1e-3, 0.0, 0.0);
        let grid = build_grid(&params, DEFAULT_R25, 5_000.0, 15_001.0, 5_000.0);
        assert_eq!(grid.resistance_ohms, vec![5_000.0, 15_000.0]);
    }

    #[test]
    fn fit_json_reads_back() {
        let path = std::env::temp_dir().join(format!("sh-fit-{}.json", std::process::id()));
        let points = vec![
            CalibrationPoint::new(10_000.0, 25.0),
            CalibrationPoint::new(14_000.0, 20.0),
            CalibrationPoint::new(7_000.0, 30.0),
            CalibrationPoint::new(20_000.0, 15.0),
        ];
        let result = sample_result();
        write_fit_json(&path, &result, &points, DEFAULT_R25).unwrap();
        let back = read_fit_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.tool, "shfit");
        assert_eq!(back.params, result.params);
        assert_eq!(back.points, points);
        assert_eq!(back.residuals, result.residuals);
        assert_eq!(back.verdict, FitQuality::Acceptable);
        assert_eq!(back.r25, DEFAULT_R25);
    }
}
