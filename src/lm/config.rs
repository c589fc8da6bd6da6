//! Configuration options for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

/// Decomposition used to solve the damped normal equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecompositionMethod {
    /// Cholesky only; a non positive-definite system rejects the step.
    Cholesky,

    /// Singular value decomposition; slower but handles rank deficiency.
    Svd,

    /// Cholesky, falling back to SVD when it fails.
    #[default]
    Auto,
}

/// Configuration for the Levenberg-Marquardt algorithm.
///
/// The damping parameter λ scales the diagonal of JᵀJ (Marquardt scaling),
/// so the iteration is insensitive to the very different magnitudes of
/// velocities (km/s) and column densities (cm⁻²).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of outer iterations (Jacobian evaluations)
    pub max_iterations: usize,

    /// Relative reduction of the cost below which an accepted step ends the fit
    pub ftol: f64,

    /// Relative step size below which the parameters are considered converged
    pub xtol: f64,

    /// Tolerance on the scaled gradient (cosine between residual and Jacobian columns)
    pub gtol: f64,

    pub initial_lambda: f64,
    pub lambda_up_factor: f64,
    pub lambda_down_factor: f64,
    pub min_lambda: f64,

    /// Damping at which the algorithm gives up
    pub max_lambda: f64,

    pub decomposition_method: DecompositionMethod,

    /// Evaluate Jacobian columns on the rayon thread pool
    pub parallel_jacobian: bool,

    /// Relative finite-difference step
    pub epsilon: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            decomposition_method: DecompositionMethod::default(),
            parallel_jacobian: false,
            epsilon: crate::utils::finite_difference::DEFAULT_EPSILON,
        }
    }
}

impl LmConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    pub fn with_decomposition(mut self, method: DecompositionMethod) -> Self {
        self.decomposition_method = method;
        self
    }

    pub fn with_parallel_jacobian(mut self, parallel: bool) -> Self {
        self.parallel_jacobian = parallel;
        self
    }
}
