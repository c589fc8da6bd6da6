//! Forward finite-difference Jacobians.
//!
//! The step for column j is `|p_j| * epsilon`, or `epsilon` itself when the
//! parameter is closer to zero than that. Column derivatives only depend on
//! their own perturbed evaluation, so the parallel version returns exactly
//! the same matrix as the serial one.

use crate::error::{Result, VoigtFitError};
use crate::problem::Problem;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

/// Default relative step size for finite differences.
pub const DEFAULT_EPSILON: f64 = 1e-8;

pub(crate) fn step_size(value: f64, eps: f64) -> f64 {
    if value.abs() > eps {
        value.abs() * eps
    } else {
        eps
    }
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(VoigtFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            expected, got
        )));
    }
    Ok(())
}

fn column<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    j: usize,
    eps: f64,
) -> Result<Array1<f64>> {
    let eps_j = step_size(params[j], eps);
    let mut perturbed = params.clone();
    perturbed[j] += eps_j;

    let shifted = problem.eval(&perturbed)?;
    check_len(residuals.len(), shifted.len())?;
    Ok((shifted - residuals) / eps_j)
}

/// Compute the Jacobian matrix J[i,j] = ∂residual[i]/∂param[j].
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    check_len(problem.residual_count(), residuals.len())?;
    jacobian_at(problem, params, &residuals, epsilon)
}

/// Jacobian when the residuals at `params` are already known.
pub fn jacobian_at<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let mut jac = Array2::zeros((residuals.len(), params.len()));

    for j in 0..params.len() {
        let col = column(problem, params, residuals, j, eps)?;
        jac.column_mut(j).assign(&col);
    }

    Ok(jac)
}

/// Same as [`jacobian_at`], with the columns evaluated on the rayon pool.
pub fn jacobian_parallel_at<P: Problem + Sync + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);

    let columns = (0..params.len())
        .into_par_iter()
        .map(|j| column(problem, params, residuals, j, eps))
        .collect::<Result<Vec<_>>>()?;

    let mut jac = Array2::zeros((residuals.len(), params.len()));
    for (j, col) in columns.iter().enumerate() {
        jac.index_axis_mut(Axis(1), j).assign(col);
    }
    Ok(jac)
}
