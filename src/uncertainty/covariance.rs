//! # Covariance Matrix Calculations
//!
//! Covariance, standard errors and correlations of fitted parameters, computed
//! the way lmfit does: `covar = redchi * inv(JᵀJ)` with J taken with respect to
//! the physical (external) values of the free parameters.

use crate::utils::{nalgebra_to_ndarray, ndarray_to_nalgebra};
use ndarray::{Array1, Array2};

/// Calculate the covariance matrix from the Jacobian of the residuals.
///
/// Returns `None` when JᵀJ is singular or the inverse is not finite, which
/// happens for parameters the residuals do not depend on (a line below the
/// noise, or two components sitting on top of each other).
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Option<Array2<f64>> {
    let jtj = ndarray_to_nalgebra(&jacobian.t().dot(jacobian));
    let n = jtj.nrows();
    if n == 0 {
        return Some(Array2::zeros((0, 0)));
    }

    // Symmetric equilibration keeps cm⁻² and km/s columns comparable.
    let scale: Vec<f64> = (0..n).map(|i| jtj[(i, i)].sqrt()).collect();
    if scale.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return None;
    }
    let scaled = nalgebra::DMatrix::from_fn(n, n, |i, j| jtj[(i, j)] / (scale[i] * scale[j]));

    let inverse = scaled.cholesky()?.inverse();
    let covar = nalgebra::DMatrix::from_fn(n, n, |i, j| inverse[(i, j)] / (scale[i] * scale[j]) * redchi);

    let covar = nalgebra_to_ndarray(&covar);
    covar.iter().all(|v| v.is_finite()).then_some(covar)
}

/// Calculate correlation matrix from covariance matrix.
///
/// `correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])`
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}

/// Extract standard errors from the covariance matrix.
///
/// A non-positive diagonal entry has no error estimate.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<Option<f64>> {
    covar
        .diag()
        .mapv(|v| if v > 0.0 && v.is_finite() { Some(v.sqrt()) } else { None })
}
