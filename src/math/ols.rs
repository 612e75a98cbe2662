//! Dense linear least-squares helpers.
//!
//! The Levenberg–Marquardt step is the solution of a small linear least
//! squares problem:
//!
//! ```text
//! minimize ‖ [J; √μ·D] δ + [r; 0] ‖²
//! ```
//!
//! Implementation choices:
//! - We solve the stacked (tall) system directly with SVD instead of forming
//!   the normal equations `JᵀJ + μD²`, which squares the condition number.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - The parameter dimension is tiny (4 columns), so SVD cost is irrelevant.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    let tol_base = svd.singular_values.iter().copied().reduce(f64::max)?;
    if !(tol_base.is_finite() && tol_base > 0.0) {
        return None;
    }

    // Progressively looser (relative) tolerances if the strict solve fails.
    for &rel in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, rel * tol_base) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Numerical rank: the number of singular values above `rel_tol · σ_max`.
pub fn numerical_rank(x: &DMatrix<f64>, rel_tol: f64) -> usize {
    let sv = x.singular_values();
    let sigma_max = sv.iter().copied().fold(0.0_f64, f64::max);
    if !(sigma_max.is_finite() && sigma_max > 0.0) {
        return 0;
    }
    sv.iter().filter(|&&s| s > rel_tol * sigma_max).count()
}

/// `(JᵀJ)⁻¹` computed from the SVD of `J` as `V Σ⁻² Vᵀ`.
///
/// Returns `None` if `J` is rank deficient at `rel_tol`.
pub fn normal_matrix_inverse(j: &DMatrix<f64>, rel_tol: f64) -> Option<DMatrix<f64>> {
    let svd = j.clone().svd(false, true);
    let v_t = svd.v_t?;
    let sv = &svd.singular_values;
    let sigma_max = sv.iter().copied().fold(0.0_f64, f64::max);
    if !(sigma_max.is_finite() && sigma_max > 0.0) || sv.len() < j.ncols() {
        return None;
    }
    if sv.iter().any(|&s| s <= rel_tol * sigma_max) {
        return None;
    }

    let p = j.ncols();
    let mut out = DMatrix::<f64>::zeros(p, p);
    for (k, &s) in sv.iter().enumerate() {
        let w = 1.0 / (s * s);
        let v_k = v_t.row(k);
        for a in 0..p {
            for b in 0..p {
                out[(a, b)] += w * v_k[a] * v_k[b];
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_rejects_zero_matrix() {
        let x = DMatrix::<f64>::zeros(3, 2);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn rank_of_repeated_rows_is_one() {
        let x = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        assert_eq!(numerical_rank(&x, 1e-10), 1);
        assert_eq!(numerical_rank(&DMatrix::<f64>::identity(3, 3), 1e-10), 3);
    }

    #[test]
    fn normal_inverse_matches_direct_inverse() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let direct = (j.transpose() * &j).try_inverse().unwrap();
        let via_svd = normal_matrix_inverse(&j, 1e-12).unwrap();
        for a in 0..2 {
            for b in 0..2 {
                assert!((direct[(a, b)] - via_svd[(a, b)]).abs() < 1e-12);
            }
        }

        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(normal_matrix_inverse(&singular, 1e-12).is_none());
    }
}
