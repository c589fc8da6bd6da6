//! # Parameter System
//!
//! Named parameters with bounds and expressions, modelled on lmfit-py.
//!
//! - [`Parameter`]: one value with a vary flag, bounds and an optional expression
//! - [`Parameters`]: an ordered collection that evaluates expressions in dependency order
//! - [`Bounds`]: box constraints and the map into an unbounded optimizer space
//! - [`Expression`]: parser and evaluator for parameter ties
//!
//! ```rust
//! use astrovoigt_rs::parameters::Parameters;
//!
//! let mut params = Parameters::new();
//! params.add_param("v_rad_0", -11.0).unwrap();
//! params.add_param_with_bounds("b_0_0", 2.0, 0.5, 5.5).unwrap();
//! params.add_param_with_bounds("N_0_0", 1.4e13, 0.0, f64::INFINITY).unwrap();
//! params.add_param_with_expr("N_1_0", 0.0, "N_0_0 / 70").unwrap();
//! params.update_expressions().unwrap();
//!
//! assert_eq!(params.get("N_1_0").unwrap().value(), 2.0e11);
//! assert_eq!(params.varying_names(), vec!["v_rad_0", "b_0_0", "N_0_0"]);
//! ```

pub mod bounds;
pub mod expression;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError};
pub use expression::{EvaluationContext, Expression, ExpressionError};
pub use parameter::{Parameter, ParameterError};
pub use parameters::Parameters;
