//! # Uncertainty Calculation
//!
//! Parameter uncertainties of a converged least-squares fit, estimated from
//! the Jacobian at the solution.

mod covariance;

pub use covariance::{calculate_correlation, calculate_covariance, standard_errors_from_covariance};

use crate::parameters::Parameters;
use std::collections::HashMap;

/// Map standard errors onto the names of the free parameters of `params`.
pub fn standard_errors(errors: &[Option<f64>], params: &Parameters) -> HashMap<String, f64> {
    params
        .varying()
        .zip(errors.iter())
        .filter_map(|(param, err)| err.map(|e| (param.name().to_string(), e)))
        .collect()
}
