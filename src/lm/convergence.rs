//! Termination states of the Levenberg-Marquardt iteration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// Steps became smaller than `xtol` relative to the parameters
    ParameterConvergence,

    /// An accepted step reduced the cost by less than `ftol` (relative)
    FunctionValueConvergence,

    /// The residual is orthogonal to the Jacobian columns within `gtol`
    GradientConvergence,

    /// The residual vector is exactly zero
    ExactFit,

    MaxIterationsReached,

    /// The damping grew past `max_lambda` without finding a better point
    DampingOverflow,
}

impl ConvergenceStatus {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::ExactFit
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small cost reduction",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::ExactFit => "Converged: zero residual",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::DampingOverflow => "Terminated: damping parameter overflow",
        }
    }
}
