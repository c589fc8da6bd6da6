//! Levenberg-Marquardt algorithm implementation.
//!
//! The optimizer works on any [`Problem`](crate::problem::Problem) and is used
//! by [`fit_model`](crate::model::fit_model) for every absorption fit.

pub mod algorithm;
pub mod config;
pub mod convergence;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::{DecompositionMethod, LmConfig};
pub use convergence::ConvergenceStatus;
