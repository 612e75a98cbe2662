//! Error types.
//!
//! Two layers:
//!
//! - `DomainError` / `FitError`: the fitting core's failure taxonomy. These are
//!   plain values the caller can match on.
//! - `AppError`: what the binary reports (message + process exit code).
//!
//! Exit codes used by the binary:
//! - `2`: input, IO or configuration problems
//! - `3`: no usable / insufficient calibration data
//! - `4`: the fit itself failed

use thiserror::Error;

/// The model function was evaluated outside its domain.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("resistance must be positive and finite, got {0}")]
    NonPositiveResistance(f64),
    #[error("reference resistance R25 must be positive and finite, got {0}")]
    NonPositiveReference(f64),
    #[error("temperature must be finite, got {0}")]
    NonFiniteTemperature(f64),
    #[error("model denominator is zero at R={resistance}")]
    ZeroDenominator { resistance: f64 },
    #[error("model evaluates to a non-finite temperature at R={resistance}")]
    NonFinite { resistance: f64 },
}

/// Failures of the nonlinear fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("insufficient calibration data: {got} point(s) supplied, at least {needed} required")]
    InsufficientData { got: usize, needed: usize },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("solver did not converge within {iterations} iterations (cost={cost:e})")]
    Convergence { iterations: usize, cost: f64 },

    #[error("singular jacobian: {reason}")]
    SingularJacobian { reason: String },
}

impl FitError {
    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::Domain(_) => 2,
            FitError::InsufficientData { .. } => 3,
            FitError::Convergence { .. } | FitError::SingularJacobian { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), format!("Fit failed: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
