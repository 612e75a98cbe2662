//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference resistance (ohms) of the thermistor at 25°C.
pub const DEFAULT_R25: f64 = 10_000.0;

/// Fit acceptability bound on the summed squared error (°C²).
///
/// Empirical bound for this calibration use case; keep it exactly `0.02`.
pub const DEFAULT_SSE_THRESHOLD: f64 = 0.02;

/// Number of model coefficients (and the minimum number of points to fit them).
pub const PARAM_COUNT: usize = 4;

/// Below this many points the fit is still performed, but flagged.
pub const RECOMMENDED_MIN_POINTS: usize = 7;

/// One measured `(resistance, temperature)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Thermistor resistance in ohms.
    pub resistance: f64,
    /// Reference temperature in °C.
    pub temperature: f64,
}

impl CalibrationPoint {
    pub fn new(resistance: f64, temperature: f64) -> Self {
        Self {
            resistance,
            temperature,
        }
    }
}

/// Steinhart-Hart coefficients `a0..a3`.
///
/// The model is
///
/// ```text
/// 1 / T_kelvin = a0 + a1·L + a2·L² + a3·L³,   L = ln(R / R25)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
}

impl ModelParameters {
    /// Typical coefficients for a 10k NTC thermistor normalized at `R25 = 10kΩ`.
    ///
    /// These are a good starting point for the solver; far-off guesses
    /// usually do not converge to anything physical.
    pub const NOMINAL: ModelParameters = ModelParameters {
        a0: 3.354016e-3,
        a1: 3.00131e-4,
        a2: 5.08516e-6,
        a3: 2.18765e-7,
    };

    pub const fn new(a0: f64, a1: f64, a2: f64, a3: f64) -> Self {
        Self { a0, a1, a2, a3 }
    }

    pub fn to_array(self) -> [f64; PARAM_COUNT] {
        [self.a0, self.a1, self.a2, self.a3]
    }

    pub fn from_array(v: [f64; PARAM_COUNT]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Fit verdict derived from the SSE threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitQuality {
    Acceptable,
    Suspect,
}

impl FitQuality {
    /// `Acceptable` iff `sse <= threshold`.
    pub fn classify(sse: f64, threshold: f64) -> Self {
        if sse <= threshold {
            FitQuality::Acceptable
        } else {
            FitQuality::Suspect
        }
    }

    pub fn is_acceptable(self) -> bool {
        self == FitQuality::Acceptable
    }

    /// One-line verdict message for reports and exports.
    pub fn message(self, threshold: f64) -> String {
        match self {
            FitQuality::Acceptable => "No Warnings. Fit looks good!".to_string(),
            FitQuality::Suspect => {
                format!("WARNING: Fit SSE is out of range (>{threshold}). Fit may be invalid.")
            }
        }
    }
}

/// Non-fatal data-quality findings attached to a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FitWarning {
    /// Fewer points than recommended for a statistically robust fit.
    FewPoints { got: usize, recommended: usize },
    /// Parameter covariance could not be estimated (no residual degrees of
    /// freedom, or a singular normal matrix).
    CovarianceUnavailable,
}

impl std::fmt::Display for FitWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitWarning::FewPoints { got, recommended } => write!(
                f,
                "Less than {recommended} data points ({got}). Did you copy data correctly?"
            ),
            FitWarning::CovarianceUnavailable => {
                write!(f, "Parameter covariance could not be estimated.")
            }
        }
    }
}

/// Output of the residual/quality evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `model(R_i) - T_i`, parallel to the input points.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals (°C²).
    pub sse: f64,
    pub verdict: FitQuality,
}

/// Result of a full calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub params: ModelParameters,
    pub residuals: Vec<f64>,
    pub sse: f64,
    pub verdict: FitQuality,
    /// Threshold the verdict was computed against.
    pub sse_threshold: f64,
    /// Diagnostic parameter covariance (row-major, `a0..a3`).
    pub covariance: Option<[[f64; PARAM_COUNT]; PARAM_COUNT]>,
    /// Solver iterations used.
    pub iterations: usize,
    pub warnings: Vec<FitWarning>,
}

impl FitResult {
    /// One-sigma parameter uncertainties from the covariance diagonal.
    pub fn standard_errors(&self) -> Option<[f64; PARAM_COUNT]> {
        let cov = self.covariance.as_ref()?;
        let mut out = [0.0; PARAM_COUNT];
        for (i, v) in out.iter_mut().enumerate() {
            *v = cov[i][i].max(0.0).sqrt();
        }
        Some(out)
    }

    /// Root-mean-square residual (°C).
    pub fn rmse(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        (self.sse / self.residuals.len() as f64).sqrt()
    }
}

/// A calibration point paired with its fitted temperature (for tables/plots).
#[derive(Debug, Clone)]
pub struct PointResidual {
    pub point: CalibrationPoint,
    pub t_fit: f64,
    pub residual: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    pub r25: f64,
    pub initial_guess: ModelParameters,
    pub sse_threshold: f64,
    pub max_iters: usize,

    pub include_diagnostic_output: bool,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}

/// A saved fit file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub r25: f64,
    pub params: ModelParameters,
    pub sse: f64,
    pub sse_threshold: f64,
    pub verdict: FitQuality,
    pub points: Vec<CalibrationPoint>,
    pub residuals: Vec<f64>,
    pub grid: CurveGrid,
}

/// The fitted curve sampled over a resistance range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub resistance_ohms: Vec<f64>,
    pub temperature_c: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_boundary_is_inclusive() {
        assert_eq!(
            FitQuality::classify(0.02, DEFAULT_SSE_THRESHOLD),
            FitQuality::Acceptable
        );
        assert_eq!(
            FitQuality::classify(0.0201, DEFAULT_SSE_THRESHOLD),
            FitQuality::Suspect
        );
        assert_eq!(FitQuality::classify(0.0, DEFAULT_SSE_THRESHOLD), FitQuality::Acceptable);
    }

    #[test]
    fn verdict_messages() {
        assert_eq!(
            FitQuality::Acceptable.message(0.02),
            "No Warnings. Fit looks good!"
        );
        assert_eq!(
            FitQuality::Suspect.message(0.02),
            "WARNING: Fit SSE is out of range (>0.02). Fit may be invalid."
        );
    }

    #[test]
    fn standard_errors_from_covariance_diagonal() {
        let mut cov = [[0.0; PARAM_COUNT]; PARAM_COUNT];
        cov[0][0] = 4.0;
        cov[1][1] = 9.0;
        cov[2][2] = 0.25;
        cov[3][3] = 1.0;
        let result = FitResult {
            params: ModelParameters::NOMINAL,
            residuals: vec![0.1, -0.1],
            sse: 0.02,
            verdict: FitQuality::Acceptable,
            sse_threshold: DEFAULT_SSE_THRESHOLD,
            covariance: Some(cov),
            iterations: 3,
            warnings: Vec::new(),
        };
        assert_eq!(result.standard_errors(), Some([2.0, 3.0, 0.5, 1.0]));
        assert!((result.rmse() - 0.1).abs() < 1e-12);
    }
}
