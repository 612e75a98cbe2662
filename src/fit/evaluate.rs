//! Residuals, SSE and the acceptability verdict for fitted coefficients.

use crate::domain::{CalibrationPoint, DEFAULT_SSE_THRESHOLD, Evaluation, FitQuality, ModelParameters};
use crate::error::DomainError;
use crate::models::temperature;

/// Evaluate a fit against the default acceptability threshold (`0.02`).
pub fn evaluate(
    points: &[CalibrationPoint],
    params: &ModelParameters,
    r25: f64,
) -> Result<Evaluation, DomainError> {
    evaluate_with_threshold(points, params, r25, DEFAULT_SSE_THRESHOLD)
}

/// Evaluate a fit against a caller-supplied SSE threshold.
///
/// `residual[i] = T_model(R_i) - T_i`, `sse = Σ residual²`.
pub fn evaluate_with_threshold(
    points: &[CalibrationPoint],
    params: &ModelParameters,
    r25: f64,
    sse_threshold: f64,
) -> Result<Evaluation, DomainError> {
    let residuals = points
        .iter()
        .map(|p| temperature(p.resistance, params, r25).map(|t| t - p.temperature))
        .collect::<Result<Vec<f64>, DomainError>>()?;

    let sse = sum_of_squares(&residuals);
    Ok(Evaluation {
        residuals,
        sse,
        verdict: FitQuality::classify(sse, sse_threshold),
    })
}

pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}
