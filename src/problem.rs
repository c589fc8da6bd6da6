//! Problem definition trait.
//!
//! A [`Problem`] is a nonlinear least-squares problem in the optimizer's own
//! (unbounded) parameter space: it maps a parameter vector to a residual
//! vector whose sum of squares is minimized.

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A nonlinear least-squares problem for the Levenberg-Marquardt algorithm.
pub trait Problem {
    /// Residual vector at `params`.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    fn parameter_count(&self) -> usize;

    fn residual_count(&self) -> usize;

    /// Whether [`Problem::jacobian`] is overridden with an analytic version.
    ///
    /// When false the optimizer computes finite differences itself, reusing
    /// residuals it already holds.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Jacobian of the residuals. Defaults to forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Sum of squared residuals.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}
