//! Core implementation of the Levenberg-Marquardt algorithm.
//!
//! Each iteration solves the Marquardt-scaled damped normal equations
//!
//! ```text
//! (D⁻¹ JᵀJ D⁻¹ + λ I) y = −D⁻¹ Jᵀr,    δ = D⁻¹ y,    D = sqrt(diag(JᵀJ))
//! ```
//!
//! A step is accepted when it lowers the sum of squared residuals; λ is then
//! decreased, otherwise it is increased and the step is recomputed from the
//! same Jacobian.

use log::{debug, trace};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use std::fmt;

use super::config::{DecompositionMethod, LmConfig};
use super::convergence::ConvergenceStatus;
use crate::error::{Result, VoigtFitError};
use crate::problem::Problem;
use crate::utils::finite_difference::{jacobian_at, jacobian_parallel_at};
use crate::utils::{nalgebra_vec_to_ndarray, ndarray_vec_to_nalgebra};

/// Result of a Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized (internal) parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals at the solution
    pub cost: f64,

    /// Number of outer iterations
    pub iterations: usize,

    /// Number of residual evaluations, including those spent on Jacobians
    pub func_evals: usize,

    /// Whether a convergence criterion was met
    pub success: bool,

    pub status: ConvergenceStatus,

    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Minimize the sum of squared residuals of `problem`, starting at `initial_params`.
    ///
    /// Errors raised by the residual function propagate. Non-finite residuals
    /// at a trial point only reject that step; non-finite residuals at the
    /// starting point are a [`VoigtFitError::ConvergenceFailure`].
    pub fn minimize<P: Problem + Sync + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n = initial_params.len();
        if n != problem.parameter_count() {
            return Err(VoigtFitError::DimensionMismatch(format!(
                "Problem expects {} parameters, got {}",
                problem.parameter_count(),
                n
            )));
        }

        let mut x = initial_params;
        let mut r = problem.eval(&x)?;
        let mut func_evals = 1;
        if r.len() != problem.residual_count() {
            return Err(VoigtFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                r.len()
            )));
        }

        let mut cost = sum_of_squares(&r);
        if !cost.is_finite() {
            return Err(VoigtFitError::ConvergenceFailure(
                "non-finite residuals at the initial point".to_string(),
            ));
        }

        let config = &self.config;
        let mut lambda = config.initial_lambda;
        let mut iterations = 0;

        let status = 'outer: loop {
            if cost == 0.0 {
                break ConvergenceStatus::ExactFit;
            }
            if n == 0 {
                break ConvergenceStatus::GradientConvergence;
            }
            if iterations >= config.max_iterations {
                break ConvergenceStatus::MaxIterationsReached;
            }
            iterations += 1;

            let jac = self.jacobian(problem, &x, &r)?;
            if !problem.has_custom_jacobian() {
                func_evals += n;
            }
            let jtj = jac.t().dot(&jac);
            let g = jac.t().dot(&r);

            // Columns without any influence get unit scale.
            let scale = jtj.diag().mapv(|d| if d > 0.0 { d.sqrt() } else { 1.0 });

            let gradient = g
                .iter()
                .zip(scale.iter())
                .map(|(gj, dj)| gj.abs() / (dj * cost.sqrt()))
                .fold(0.0_f64, f64::max);
            if gradient <= config.gtol {
                break ConvergenceStatus::GradientConvergence;
            }

            loop {
                let step = match solve_scaled(&jtj, &g, &scale, lambda, config.decomposition_method) {
                    Some(step) => step,
                    None => {
                        lambda *= config.lambda_up_factor;
                        if lambda > config.max_lambda {
                            break 'outer ConvergenceStatus::DampingOverflow;
                        }
                        continue;
                    }
                };

                let small_step = step
                    .iter()
                    .zip(x.iter())
                    .all(|(dj, xj)| dj.abs() <= config.xtol * (xj.abs() + config.xtol));

                let trial = &x + &step;
                let r_trial = problem.eval(&trial)?;
                func_evals += 1;
                let cost_trial = sum_of_squares(&r_trial);

                if cost_trial.is_finite() && cost_trial < cost {
                    let actual = (cost - cost_trial) / cost;
                    let predicted = predicted_reduction(&jtj, &g, &step) / cost;
                    trace!(
                        "lm iteration {}: cost {:.6e} -> {:.6e}, lambda {:.1e}",
                        iterations,
                        cost,
                        cost_trial,
                        lambda
                    );

                    x = trial;
                    r = r_trial;
                    cost = cost_trial;
                    lambda = (lambda * config.lambda_down_factor).max(config.min_lambda);

                    if actual <= config.ftol && predicted <= config.ftol {
                        break 'outer ConvergenceStatus::FunctionValueConvergence;
                    }
                    if small_step {
                        break 'outer ConvergenceStatus::ParameterConvergence;
                    }
                    break;
                }

                // No better point this close to the current one.
                if small_step {
                    break 'outer ConvergenceStatus::ParameterConvergence;
                }

                lambda *= config.lambda_up_factor;
                if lambda > config.max_lambda {
                    break 'outer ConvergenceStatus::DampingOverflow;
                }
            }
        };

        debug!(
            "lm finished after {} iterations ({} evaluations): {}, cost {:.6e}",
            iterations,
            func_evals,
            status.description(),
            cost
        );

        Ok(LmResult {
            params: x,
            residuals: r,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            status,
            message: status.description().to_string(),
        })
    }

    fn jacobian<P: Problem + Sync + ?Sized>(
        &self,
        problem: &P,
        x: &Array1<f64>,
        r: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(x)
        } else if self.config.parallel_jacobian {
            jacobian_parallel_at(problem, x, r, Some(self.config.epsilon))
        } else {
            jacobian_at(problem, x, r, Some(self.config.epsilon))
        }
    }
}

fn sum_of_squares(r: &Array1<f64>) -> f64 {
    r.iter().map(|v| v * v).sum()
}

/// Cost reduction predicted by the linear model: −(2δᵀg + δᵀJᵀJδ).
fn predicted_reduction(jtj: &Array2<f64>, g: &Array1<f64>, step: &Array1<f64>) -> f64 {
    -(2.0 * step.dot(g) + step.dot(&jtj.dot(step)))
}

/// Solve the scaled damped system; `None` if the decomposition fails or the
/// step is not finite.
fn solve_scaled(
    jtj: &Array2<f64>,
    g: &Array1<f64>,
    scale: &Array1<f64>,
    lambda: f64,
    method: DecompositionMethod,
) -> Option<Array1<f64>> {
    let n = g.len();
    let a = DMatrix::from_fn(n, n, |i, j| {
        let damping = if i == j { lambda } else { 0.0 };
        jtj[[i, j]] / (scale[i] * scale[j]) + damping
    });
    let b = ndarray_vec_to_nalgebra(&(-g / scale));

    let cholesky = || a.clone().cholesky().map(|c| c.solve(&b));
    let svd = || a.clone().svd(true, true).solve(&b, 1e-14).ok();

    let y = match method {
        DecompositionMethod::Cholesky => cholesky(),
        DecompositionMethod::Svd => svd(),
        DecompositionMethod::Auto => cholesky().or_else(svd),
    }?;

    let step = nalgebra_vec_to_ndarray(&y) / scale;
    step.iter().all(|v| v.is_finite()).then_some(step)
}
