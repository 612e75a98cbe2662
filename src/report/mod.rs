//! Reporting utilities: per-point residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{CalibrationPoint, FitResult, PointResidual};

/// Pair each calibration point with its fitted temperature and residual.
pub fn pair_residuals(points: &[CalibrationPoint], result: &FitResult) -> Vec<PointResidual> {
    points
        .iter()
        .zip(result.residuals.iter())
        .map(|(p, &residual)| PointResidual {
            point: *p,
            t_fit: p.temperature + residual,
            residual,
        })
        .collect()
}
