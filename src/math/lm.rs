//! Levenberg–Marquardt nonlinear least squares.
//!
//! Problems expose residuals and a Jacobian; solvers turn an initial guess into
//! a local minimizer of `½‖r(x)‖²`. The fitter only talks to the
//! `LeastSquaresSolver` trait, so a different backend can be dropped in.
//!
//! The default backend follows the usual MINPACK-style recipe:
//! - Marquardt scaling `D = diag(‖J_j‖)`, so coefficients of very different
//!   magnitude (a0 ≈ 1e-3, a3 ≈ 1e-7) are stepped on a common footing
//! - damping update after Nielsen (smooth decrease on good steps, doubling
//!   growth on rejected ones)
//! - termination on relative cost reduction (`ftol`), relative scaled step
//!   (`xtol`), gradient orthogonality (`gtol`) or an absolute cost floor

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use crate::error::FitError;
use crate::math::ols::{numerical_rank, solve_least_squares};

/// A nonlinear least-squares problem with dense residual/Jacobian evaluation.
pub trait LeastSquaresProblem {
    /// Number of unknowns.
    fn param_count(&self) -> usize;

    /// Residual vector `r(x)`.
    fn residuals(&self, x: &DVector<f64>) -> Result<DVector<f64>, FitError>;

    /// Jacobian `∂r_i/∂x_j` (rows = residuals, columns = parameters).
    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, FitError>;
}

/// Solver backend.
pub trait LeastSquaresSolver {
    fn solve<P: LeastSquaresProblem>(
        &self,
        problem: &P,
        x0: DVector<f64>,
    ) -> Result<(DVector<f64>, SolveReport), FitError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    /// Maximum number of iterations (accepted or rejected steps).
    pub max_iters: usize,
    /// Relative tolerance on the cost reduction (actual and predicted).
    pub ftol: f64,
    /// Relative tolerance on the scaled step length.
    pub xtol: f64,
    /// Tolerance on the cosine between residual and Jacobian columns.
    pub gtol: f64,
    /// Absolute cost (`½‖r‖²`) below which the fit is considered exact.
    pub cost_floor: f64,
    /// Initial damping `μ` (dimensionless; the step penalty is `μ·D²`).
    pub initial_damping: f64,
    /// Relative singular-value tolerance for rank checks.
    pub rank_tol: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            cost_floor: 1e-24,
            initial_damping: 1e-3,
            rank_tol: 1e-10,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Cost fell below `cost_floor`.
    ExactFit,
    /// Relative cost reduction below `ftol`.
    CostTolerance,
    /// Relative step below `xtol`.
    StepTolerance,
    /// Residual orthogonal to the Jacobian columns within `gtol`.
    GradientTolerance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub iterations: usize,
    /// Final `½‖r‖²`.
    pub final_cost: f64,
    pub termination: Termination,
}

/// Levenberg–Marquardt backend.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    opts: SolveOptions,
}

impl LevenbergMarquardt {
    pub fn new(opts: SolveOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.opts
    }
}

impl LeastSquaresSolver for LevenbergMarquardt {
    fn solve<P: LeastSquaresProblem>(
        &self,
        problem: &P,
        x0: DVector<f64>,
    ) -> Result<(DVector<f64>, SolveReport), FitError> {
        let opts = &self.opts;
        let p = problem.param_count();
        if x0.len() != p {
            return Err(FitError::SingularJacobian {
                reason: format!("initial guess has {} entries, expected {p}", x0.len()),
            });
        }

        let mut x = x0;
        let mut r = problem.residuals(&x)?;
        let mut cost = half_norm_sq(&r);
        let mut jac = problem.jacobian(&x)?;

        let rank = numerical_rank(&jac, opts.rank_tol);
        if rank < p {
            return Err(FitError::SingularJacobian {
                reason: format!("jacobian has rank {rank} at the initial guess, expected {p}"),
            });
        }

        // `D` carries the units, so the damping itself stays dimensionless.
        let mut scale = column_norms(&jac);
        let mut damping = opts.initial_damping;
        let mut growth = 2.0;

        for iter in 0..opts.max_iters {
            if cost <= opts.cost_floor {
                return Ok(done(x, iter, cost, Termination::ExactFit));
            }
            if gradient_cosine(&jac, &r, &scale) <= opts.gtol {
                return Ok(done(x, iter, cost, Termination::GradientTolerance));
            }

            let Some(step) = damped_step(&jac, &r, &scale, damping) else {
                trace!("lm iter {iter}: step solve failed, damping={damping:e}");
                damping *= growth;
                growth *= 2.0;
                continue;
            };

            let x_new = &x + &step;
            let trial = match problem.residuals(&x_new) {
                Ok(r_new) => {
                    let c = half_norm_sq(&r_new);
                    c.is_finite().then_some((r_new, c))
                }
                // Stepped outside the model's domain: treat like a bad step.
                Err(FitError::Domain(e)) => {
                    trace!("lm iter {iter}: trial point rejected ({e})");
                    None
                }
                Err(e) => return Err(e),
            };

            let predicted = predicted_reduction(&jac, &r, &step, &scale, damping);
            match trial {
                Some((r_new, cost_new)) if predicted > 0.0 && cost_new < cost => {
                    let rho = (cost - cost_new) / predicted;
                    let reduction = cost - cost_new;
                    trace!(
                        "lm iter {iter}: accepted cost={cost_new:e} rho={rho:.3} damping={damping:e}"
                    );

                    let small_step =
                        scaled_norm(&step, &scale) <= opts.xtol * (scaled_norm(&x, &scale) + opts.xtol);

                    x = x_new;
                    r = r_new;
                    cost = cost_new;
                    jac = problem.jacobian(&x)?;
                    scale = merge_scale(&scale, &column_norms(&jac));

                    damping *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                    growth = 2.0;

                    if reduction <= opts.ftol * (cost + reduction) {
                        return Ok(done(x, iter + 1, cost, Termination::CostTolerance));
                    }
                    if small_step {
                        return Ok(done(x, iter + 1, cost, Termination::StepTolerance));
                    }
                }
                Some((_, cost_new)) => {
                    // Neither the model nor the data promise any further gain.
                    if predicted <= opts.ftol * cost && (cost - cost_new).abs() <= opts.ftol * cost {
                        return Ok(done(x, iter + 1, cost, Termination::CostTolerance));
                    }
                    damping *= growth;
                    growth *= 2.0;
                }
                None => {
                    damping *= growth;
                    growth *= 2.0;
                }
            }
            if !damping.is_finite() {
                break;
            }
        }

        debug!(
            "lm: no convergence after {} iterations, cost={cost:e}",
            opts.max_iters
        );
        Err(FitError::Convergence {
            iterations: opts.max_iters,
            cost,
        })
    }
}

fn done(x: DVector<f64>, iterations: usize, cost: f64, termination: Termination) -> (DVector<f64>, SolveReport) {
    debug!("lm: {termination:?} after {iterations} iterations, cost={cost:e}");
    (
        x,
        SolveReport {
            iterations,
            final_cost: cost,
            termination,
        },
    )
}

fn half_norm_sq(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

fn column_norms(jac: &DMatrix<f64>) -> Vec<f64> {
    jac.column_iter()
        .map(|c| {
            let n = c.norm();
            if n > 0.0 { n } else { 1.0 }
        })
        .collect()
}

/// Scaling never shrinks between iterations (MINPACK `mode=1`).
fn merge_scale(prev: &[f64], next: &[f64]) -> Vec<f64> {
    prev.iter().zip(next).map(|(a, b)| a.max(*b)).collect()
}

fn scaled_norm(v: &DVector<f64>, scale: &[f64]) -> f64 {
    v.iter()
        .zip(scale)
        .map(|(x, d)| (x * d) * (x * d))
        .sum::<f64>()
        .sqrt()
}

/// `max_j |J_jᵀ r| / (‖J_j‖ ‖r‖)`.
fn gradient_cosine(jac: &DMatrix<f64>, r: &DVector<f64>, scale: &[f64]) -> f64 {
    let r_norm = r.norm();
    if r_norm == 0.0 {
        return 0.0;
    }
    jac.column_iter()
        .zip(scale)
        .map(|(c, d)| (c.dot(r) / (d * r_norm)).abs())
        .fold(0.0, f64::max)
}

/// Solve `[J; √μ·D] δ ≈ [-r; 0]` in the least-squares sense.
fn damped_step(jac: &DMatrix<f64>, r: &DVector<f64>, scale: &[f64], damping: f64) -> Option<DVector<f64>> {
    let (n, p) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    let mut b = DVector::<f64>::zeros(n + p);

    a.rows_mut(0, n).copy_from(jac);
    for i in 0..n {
        b[i] = -r[i];
    }
    let sqrt_mu = damping.sqrt();
    for (j, d) in scale.iter().enumerate() {
        a[(n + j, j)] = sqrt_mu * d;
    }

    solve_least_squares(&a, &b)
}

/// Reduction of the linearized cost: `½δᵀ(μD²δ - g)` with `g = Jᵀr`.
fn predicted_reduction(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    step: &DVector<f64>,
    scale: &[f64],
    damping: f64,
) -> f64 {
    let g = jac.transpose() * r;
    step.iter()
        .zip(g.iter())
        .zip(scale)
        .map(|((s, g), d)| s * (damping * d * d * s - g))
        .sum::<f64>()
        * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = a·exp(b·x)` sampled without noise.
    struct ExpDecay {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn param_count(&self) -> usize {
            2
        }

        fn residuals(&self, p: &DVector<f64>) -> Result<DVector<f64>, FitError> {
            Ok(DVector::from_iterator(
                self.x.len(),
                self.x
                    .iter()
                    .zip(&self.y)
                    .map(|(&x, &y)| p[0] * (p[1] * x).exp() - y),
            ))
        }

        fn jacobian(&self, p: &DVector<f64>) -> Result<DMatrix<f64>, FitError> {
            let mut j = DMatrix::zeros(self.x.len(), 2);
            for (i, &x) in self.x.iter().enumerate() {
                let e = (p[1] * x).exp();
                j[(i, 0)] = e;
                j[(i, 1)] = p[0] * x * e;
            }
            Ok(j)
        }
    }

    fn exp_problem(a: f64, b: f64) -> ExpDecay {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y = x.iter().map(|&x| a * (b * x).exp()).collect();
        ExpDecay { x, y }
    }

    #[test]
    fn recovers_exponential_parameters() {
        let problem = exp_problem(2.5, -1.3);
        let solver = LevenbergMarquardt::default();
        let (p, report) = solver
            .solve(&problem, DVector::from_row_slice(&[1.0, -0.5]))
            .unwrap();

        assert!((p[0] - 2.5).abs() < 1e-8, "a={}", p[0]);
        assert!((p[1] + 1.3).abs() < 1e-8, "b={}", p[1]);
        assert!(report.final_cost < 1e-16);
        assert!(report.iterations > 0);
    }

    #[test]
    fn exact_initial_guess_terminates_immediately() {
        let problem = exp_problem(2.5, -1.3);
        let solver = LevenbergMarquardt::default();
        let (_, report) = solver
            .solve(&problem, DVector::from_row_slice(&[2.5, -1.3]))
            .unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.termination, Termination::ExactFit);
    }

    #[test]
    fn exhausted_budget_is_a_convergence_error() {
        let problem = exp_problem(2.5, -1.3);
        let solver = LevenbergMarquardt::new(SolveOptions {
            max_iters: 1,
            ..SolveOptions::default()
        });
        let err = solver
            .solve(&problem, DVector::from_row_slice(&[10.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, FitError::Convergence { iterations: 1, .. }), "{err:?}");
    }

    #[test]
    fn rank_deficient_jacobian_is_rejected() {
        // All samples at x = 0: the b column of the Jacobian vanishes.
        let problem = ExpDecay {
            x: vec![0.0; 5],
            y: vec![1.0; 5],
        };
        let err = LevenbergMarquardt::default()
            .solve(&problem, DVector::from_row_slice(&[1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, FitError::SingularJacobian { .. }), "{err:?}");
    }
}
