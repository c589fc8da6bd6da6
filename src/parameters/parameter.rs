//! A single named model parameter.
//!
//! A [`Parameter`] is one scalar of the absorption model: a shared radial
//! velocity, a Doppler width or a column density. It is free, fixed, or tied
//! to other parameters through an expression, and keeps its standard error
//! once a fit has produced one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parameters::bounds::{Bounds, BoundsError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Parameter '{name}' is tied by an expression and cannot vary")]
    ExpressionAndVary { name: String },

    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Cannot evaluate expression for parameter '{name}': {message}")]
    ExpressionEvaluation { name: String, message: String },

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Circular dependency in expression for parameter '{name}'")]
    CircularDependency { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    value: f64,
    /// Value at construction, kept for reports
    init_value: f64,
    vary: bool,
    #[serde(default)]
    bounds: Bounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stderr: Option<f64>,
}

impl Parameter {
    fn build(name: &str, value: f64, bounds: Bounds, expr: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            vary: expr.is_none(),
            bounds,
            expr,
            stderr: None,
        }
    }

    /// Free and unbounded.
    ///
    /// ```
    /// use astrovoigt_rs::parameters::parameter::Parameter;
    ///
    /// let v = Parameter::new("v_rad_0", -11.0);
    /// assert_eq!((v.name(), v.value(), v.vary()), ("v_rad_0", -11.0, true));
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self::build(name, value, Bounds::open(), None)
    }

    /// Free within `[min, max]`. A starting value outside is clamped in.
    ///
    /// ```
    /// use astrovoigt_rs::parameters::parameter::Parameter;
    ///
    /// let b = Parameter::with_bounds("b_0_0", 0.45, 0.5, 5.5).unwrap();
    /// assert_eq!((b.value(), b.max()), (0.5, 5.5));
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max)?;
        Ok(Self::build(name, bounds.clamp(value), bounds, None))
    }

    /// Tied to `expr`; its value is recomputed, never fitted.
    pub fn with_expr(name: &str, value: f64, expr: &str) -> Self {
        Self::build(name, value, Bounds::open(), Some(expr.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Fails if `value` is outside the bounds; the old value is kept then.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !self.bounds.contains(value) {
            return Err(BoundsError::OutOfRange {
                value,
                min: self.bounds.min,
                max: self.bounds.max,
            }
            .into());
        }
        self.value = value;
        Ok(())
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    pub fn vary(&self) -> bool {
        self.vary
    }

    pub fn set_vary(&mut self, vary: bool) -> Result<(), ParameterError> {
        if vary && self.expr.is_some() {
            return Err(ParameterError::ExpressionAndVary {
                name: self.name.clone(),
            });
        }
        self.vary = vary;
        Ok(())
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn expr(&self) -> Option<&str> {
        self.expr.as_deref()
    }

    /// Tying fixes the parameter. Untying leaves it fixed until the caller
    /// frees it.
    pub(crate) fn set_expr(&mut self, expr: Option<&str>) {
        self.expr = expr.map(str::to_string);
        if self.expr.is_some() {
            self.vary = false;
        }
    }

    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    /// Current value in the optimizer's unbounded space.
    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        Ok(self.bounds.to_internal(self.value)?)
    }

    /// Physical value for an optimizer value; always inside the bounds.
    pub fn from_internal(&self, internal: f64) -> f64 {
        self.bounds.to_external(internal)
    }
}
