//! One calibration run: fit, evaluate, attach warnings.
//!
//! This is the single entry point front-ends use. The options mirror what a
//! run can ask for; `plot` and `include_diagnostic_output` are carried for the
//! presentation layer and do not change the numbers.

use log::{info, warn};

use crate::domain::{
    CalibrationPoint, DEFAULT_SSE_THRESHOLD, FitResult, FitWarning, ModelParameters,
    RECOMMENDED_MIN_POINTS,
};
use crate::error::FitError;
use crate::fit::evaluate::evaluate_with_threshold;
use crate::fit::fitter::fit;
use crate::math::SolveOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct FitterOptions {
    /// Print covariance, solver stats and the per-point residual table.
    pub include_diagnostic_output: bool,
    /// Render a plot of the data and the fitted curve.
    pub plot: bool,
    /// Acceptability bound on the SSE (°C²).
    pub sse_threshold: f64,
    pub solver: SolveOptions,
}

impl Default for FitterOptions {
    fn default() -> Self {
        Self {
            include_diagnostic_output: false,
            plot: true,
            sse_threshold: DEFAULT_SSE_THRESHOLD,
            solver: SolveOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurveFitter {
    options: FitterOptions,
}

impl CurveFitter {
    pub fn new(options: FitterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FitterOptions {
        &self.options
    }

    /// Fit `points` starting from `initial_guess` and grade the result.
    pub fn run(
        &self,
        points: &[CalibrationPoint],
        initial_guess: ModelParameters,
        r25: f64,
    ) -> Result<FitResult, FitError> {
        let fitted = fit(points, initial_guess, r25, &self.options.solver)?;
        let eval = evaluate_with_threshold(points, &fitted.params, r25, self.options.sse_threshold)?;

        let mut warnings = Vec::new();
        if points.len() < RECOMMENDED_MIN_POINTS {
            let w = FitWarning::FewPoints {
                got: points.len(),
                recommended: RECOMMENDED_MIN_POINTS,
            };
            warn!("{w}");
            warnings.push(w);
        }
        if fitted.covariance.is_none() {
            warnings.push(FitWarning::CovarianceUnavailable);
        }

        info!(
            "fit converged in {} iterations ({:?}): SSE={:e}",
            fitted.report.iterations, fitted.report.termination, eval.sse
        );
        if !eval.verdict.is_acceptable() {
            warn!("{}", eval.verdict.message(self.options.sse_threshold));
        }

        Ok(FitResult {
            params: fitted.params,
            residuals: eval.residuals,
            sse: eval.sse,
            verdict: eval.verdict,
            sse_threshold: self.options.sse_threshold,
            covariance: fitted.covariance,
            iterations: fitted.report.iterations,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_R25, FitQuality};
    use crate::models::temperature;

    fn points_from(params: &ModelParameters, resistances: &[f64]) -> Vec<CalibrationPoint> {
        resistances
            .iter()
            .map(|&r| CalibrationPoint::new(r, temperature(r, params, DEFAULT_R25).unwrap()))
            .collect()
    }

    #[test]
    fn end_to_end_four_point_example() {
        let points = points_from(
            &ModelParameters::NOMINAL,
            &[10_000.0, 14_000.0, 7_000.0, 20_000.0],
        );
        let result = CurveFitter::default()
            .run(&points, ModelParameters::NOMINAL, DEFAULT_R25)
            .unwrap();

        assert!(result.params.is_finite());
        assert_eq!(result.residuals.len(), 4);
        assert!(result.sse < 1e-12);
        assert_eq!(result.verdict, FitQuality::Acceptable);
        assert_eq!(result.sse_threshold, DEFAULT_SSE_THRESHOLD);
        assert!(result.warnings.contains(&FitWarning::FewPoints { got: 4, recommended: 7 }));
        assert!(result.warnings.contains(&FitWarning::CovarianceUnavailable));
    }

    #[test]
    fn enough_points_produce_no_warnings() {
        let points = points_from(
            &ModelParameters::NOMINAL,
            &[1_000.0, 2_500.0, 5_000.0, 8_000.0, 10_000.0, 14_000.0, 20_000.0, 30_000.0],
        );
        let result = CurveFitter::default()
            .run(&points, ModelParameters::NOMINAL, DEFAULT_R25)
            .unwrap();
        // Exact data leaves SSE at zero, but the covariance scale is still defined.
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn noisy_data_is_flagged_against_threshold() {
        let mut points = points_from(
            &ModelParameters::NOMINAL,
            &[1_000.0, 2_500.0, 5_000.0, 8_000.0, 10_000.0, 14_000.0, 20_000.0, 30_000.0],
        );
        // Alternating ±0.2°C error cannot be absorbed by a smooth cubic-in-log model.
        for (i, p) in points.iter_mut().enumerate() {
            p.temperature += if i % 2 == 0 { 0.2 } else { -0.2 };
        }

        let result = CurveFitter::default()
            .run(&points, ModelParameters::NOMINAL, DEFAULT_R25)
            .unwrap();
        assert_eq!(result.verdict, FitQuality::Suspect);
        assert!(result.sse > DEFAULT_SSE_THRESHOLD);
        let manual: f64 = result.residuals.iter().map(|r| r * r).sum();
        assert!((result.sse - manual).abs() <= 1e-9 * manual);

        let lenient = CurveFitter::new(FitterOptions {
            sse_threshold: 1.0,
            ..FitterOptions::default()
        })
        .run(&points, ModelParameters::NOMINAL, DEFAULT_R25)
        .unwrap();
        assert_eq!(lenient.verdict, FitQuality::Acceptable);
        assert_eq!(lenient.sse_threshold, 1.0);
    }

    #[test]
    fn converges_from_nominal_on_a_different_thermistor() {
        let truth = ModelParameters::new(3.36e-3, 2.95e-4, 4.0e-6, 1.5e-7);
        let mut points = points_from(
            &truth,
            &[475.0, 900.0, 1_800.0, 3_500.0, 6_000.0, 10_000.0, 15_000.0, 23_000.0],
        );
        for (i, p) in points.iter_mut().enumerate() {
            p.temperature += [0.03, -0.02, 0.01, -0.03, 0.02, -0.01, 0.02, -0.02][i];
        }
        let at_truth = crate::fit::evaluate(&points, &truth, DEFAULT_R25).unwrap().sse;

        let result = CurveFitter::default()
            .run(&points, ModelParameters::NOMINAL, DEFAULT_R25)
            .unwrap();
        assert!(result.iterations > 1);
        assert!(result.sse <= at_truth * (1.0 + 1e-9), "sse={}, at truth={at_truth}", result.sse);
        assert_eq!(result.verdict, FitQuality::Acceptable);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn fit_errors_propagate_unchanged() {
        let points = points_from(&ModelParameters::NOMINAL, &[10_000.0, 14_000.0, 7_000.0]);
        let err = CurveFitter::default()
            .run(&points, ModelParameters::NOMINAL, DEFAULT_R25)
            .unwrap_err();
        assert_eq!(err, FitError::InsufficientData { got: 3, needed: 4 });
    }
}
