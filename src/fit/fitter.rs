//! Nonlinear least-squares fit of the Steinhart-Hart coefficients.
//!
//! Given:
//! - calibration points `(R_i, T_i)`
//! - a reference resistance `R25`
//! - an initial coefficient guess
//!
//! we minimize `Σ (T_model(R_i) - T_i)²` over `a0..a3` with a
//! Levenberg–Marquardt solver, and estimate the parameter covariance at the
//! solution for diagnostics.
//!
//! Input checks run before any optimization, in this order: reference
//! resistance, point count, per-point domain, distinct resistances.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{CalibrationPoint, ModelParameters, PARAM_COUNT};
use crate::error::{DomainError, FitError};
use crate::math::{
    LeastSquaresProblem, LeastSquaresSolver, LevenbergMarquardt, SolveOptions, SolveReport,
    normal_matrix_inverse,
};
use crate::models::{log_ratio, temperature, temperature_with_gradient};

/// Singular-value tolerance used when inverting `JᵀJ` for the covariance.
const COVARIANCE_RANK_TOL: f64 = 1e-12;

/// Fitted coefficients plus solver diagnostics.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub params: ModelParameters,
    /// `(JᵀJ)⁻¹ · SSE / (n - 4)`; `None` when `n <= 4` or `JᵀJ` is singular.
    pub covariance: Option<[[f64; PARAM_COUNT]; PARAM_COUNT]>,
    pub report: SolveReport,
}

/// Residuals `T_model(R_i) - T_i` as a least-squares problem in `a0..a3`.
struct SteinhartHartProblem<'a> {
    points: &'a [CalibrationPoint],
    r25: f64,
}

impl LeastSquaresProblem for SteinhartHartProblem<'_> {
    fn param_count(&self) -> usize {
        PARAM_COUNT
    }

    fn residuals(&self, x: &DVector<f64>) -> Result<DVector<f64>, FitError> {
        let params = params_from_vector(x);
        let mut r = DVector::<f64>::zeros(self.points.len());
        for (i, p) in self.points.iter().enumerate() {
            r[i] = temperature(p.resistance, &params, self.r25)? - p.temperature;
        }
        Ok(r)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, FitError> {
        let params = params_from_vector(x);
        let mut jac = DMatrix::<f64>::zeros(self.points.len(), PARAM_COUNT);
        for (i, p) in self.points.iter().enumerate() {
            let (_, grad) = temperature_with_gradient(p.resistance, &params, self.r25)?;
            for (j, g) in grad.iter().enumerate() {
                jac[(i, j)] = *g;
            }
        }
        Ok(jac)
    }
}

/// Fit the coefficients with the default Levenberg–Marquardt backend.
pub fn fit(
    points: &[CalibrationPoint],
    initial_guess: ModelParameters,
    r25: f64,
    opts: &SolveOptions,
) -> Result<FittedModel, FitError> {
    fit_with(points, initial_guess, r25, &LevenbergMarquardt::new(*opts))
}

/// Fit the coefficients with any solver backend.
pub fn fit_with<S: LeastSquaresSolver>(
    points: &[CalibrationPoint],
    initial_guess: ModelParameters,
    r25: f64,
    solver: &S,
) -> Result<FittedModel, FitError> {
    validate_inputs(points, r25)?;

    debug!(
        "fitting {} points, R25={r25}, guess={:?}",
        points.len(),
        initial_guess.to_array()
    );

    let problem = SteinhartHartProblem { points, r25 };
    let x0 = DVector::from_row_slice(&initial_guess.to_array());
    let (x, report) = solver.solve(&problem, x0)?;

    let params = params_from_vector(&x);
    if !params.is_finite() {
        return Err(FitError::Convergence {
            iterations: report.iterations,
            cost: report.final_cost,
        });
    }

    let covariance = estimate_covariance(&problem, &x, 2.0 * report.final_cost);

    Ok(FittedModel {
        params,
        covariance,
        report,
    })
}

fn validate_inputs(points: &[CalibrationPoint], r25: f64) -> Result<(), FitError> {
    if !(r25.is_finite() && r25 > 0.0) {
        return Err(DomainError::NonPositiveReference(r25).into());
    }
    if points.len() < PARAM_COUNT {
        return Err(FitError::InsufficientData {
            got: points.len(),
            needed: PARAM_COUNT,
        });
    }
    for p in points {
        log_ratio(p.resistance, r25)?;
        if !p.temperature.is_finite() {
            return Err(DomainError::NonFiniteTemperature(p.temperature).into());
        }
    }

    let distinct = distinct_resistances(points);
    if distinct < PARAM_COUNT {
        return Err(FitError::SingularJacobian {
            reason: format!(
                "only {distinct} distinct resistance value(s), at least {PARAM_COUNT} needed"
            ),
        });
    }

    Ok(())
}

fn distinct_resistances(points: &[CalibrationPoint]) -> usize {
    let mut r: Vec<f64> = points.iter().map(|p| p.resistance).collect();
    r.sort_by(f64::total_cmp);
    r.dedup();
    r.len()
}

fn estimate_covariance(
    problem: &SteinhartHartProblem<'_>,
    x: &DVector<f64>,
    sse: f64,
) -> Option<[[f64; PARAM_COUNT]; PARAM_COUNT]> {
    let n = problem.points.len();
    if n <= PARAM_COUNT {
        return None;
    }
    let jac = problem.jacobian(x).ok()?;
    let inv = normal_matrix_inverse(&jac, COVARIANCE_RANK_TOL)?;
    let s2 = sse / (n - PARAM_COUNT) as f64;

    let mut out = [[0.0; PARAM_COUNT]; PARAM_COUNT];
    for (a, row) in out.iter_mut().enumerate() {
        for (b, v) in row.iter_mut().enumerate() {
            *v = inv[(a, b)] * s2;
        }
    }
    out.iter().flatten().all(|v| v.is_finite()).then_some(out)
}

fn params_from_vector(x: &DVector<f64>) -> ModelParameters {
    ModelParameters::new(x[0], x[1], x[2], x[3])
}
