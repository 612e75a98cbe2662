//! Steinhart-Hart model evaluation.
//!
//! ```text
//! L = ln(R / R25)
//! T = 1 / (a0 + a1·L + a2·L² + a3·L³) - 273.15      (°C)
//! ```
//!
//! The fitter relies on two primitive operations:
//! - evaluate `T(R)` for given coefficients (residuals, plots)
//! - evaluate `T(R)` together with `∂T/∂a_k` (solver Jacobian)

use crate::domain::{ModelParameters, PARAM_COUNT};
use crate::error::DomainError;

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Normalized log-resistance `ln(R / R25)`.
pub fn log_ratio(resistance: f64, r25: f64) -> Result<f64, DomainError> {
    if !(r25.is_finite() && r25 > 0.0) {
        return Err(DomainError::NonPositiveReference(r25));
    }
    if !(resistance.is_finite() && resistance > 0.0) {
        return Err(DomainError::NonPositiveResistance(resistance));
    }
    Ok((resistance / r25).ln())
}

/// Inverse absolute temperature `a0 + a1·L + a2·L² + a3·L³` (Horner form).
pub fn inverse_kelvin(params: &ModelParameters, l: f64) -> f64 {
    params.a0 + l * (params.a1 + l * (params.a2 + l * params.a3))
}

/// Temperature in °C predicted for `resistance`.
pub fn temperature(resistance: f64, params: &ModelParameters, r25: f64) -> Result<f64, DomainError> {
    let l = log_ratio(resistance, r25)?;
    let d = checked_denominator(params, l, resistance)?;
    finite(1.0 / d - KELVIN_OFFSET, resistance)
}

/// Temperature in °C plus its partial derivatives with respect to `a0..a3`.
///
/// `∂T/∂a_k = -L^k / D²` where `D` is the model denominator.
pub fn temperature_with_gradient(
    resistance: f64,
    params: &ModelParameters,
    r25: f64,
) -> Result<(f64, [f64; PARAM_COUNT]), DomainError> {
    let l = log_ratio(resistance, r25)?;
    let d = checked_denominator(params, l, resistance)?;
    let t = finite(1.0 / d - KELVIN_OFFSET, resistance)?;

    let inv_d2 = 1.0 / (d * d);
    let mut grad = [0.0; PARAM_COUNT];
    let mut l_pow = 1.0;
    for g in grad.iter_mut() {
        *g = -l_pow * inv_d2;
        l_pow *= l;
    }
    if grad.iter().any(|g| !g.is_finite()) {
        return Err(DomainError::NonFinite { resistance });
    }

    Ok((t, grad))
}

fn checked_denominator(params: &ModelParameters, l: f64, resistance: f64) -> Result<f64, DomainError> {
    let d = inverse_kelvin(params, l);
    if d == 0.0 {
        return Err(DomainError::ZeroDenominator { resistance });
    }
    if !d.is_finite() {
        return Err(DomainError::NonFinite { resistance });
    }
    Ok(d)
}

fn finite(t: f64, resistance: f64) -> Result<f64, DomainError> {
    if t.is_finite() {
        Ok(t)
    } else {
        Err(DomainError::NonFinite { resistance })
    }
}
