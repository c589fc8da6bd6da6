//! Parameters collection implementation
//!
//! [`Parameters`] keeps parameters in insertion order, so the vector of free
//! values handed to the optimizer always has the same layout. Expressions are
//! parsed once when they are attached and evaluated in dependency order after
//! every update of the free values.

use crate::error::{Result, VoigtFitError};
use crate::parameters::expression::{EvaluationContext, Expression, ExpressionError};
use crate::parameters::parameter::{Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// An ordered collection of named parameters
///
/// Similar to the Parameters class in lmfit-py.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct Parameters {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
    /// Parsed expression for each slot that has one
    compiled: Vec<Option<Expression>>,
    /// Expression slots, dependencies first
    eval_order: Vec<usize>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameters {
    /// Create a new empty parameters collection
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            index: HashMap::new(),
            compiled: Vec::new(),
            eval_order: Vec::new(),
        }
    }

    /// Add a parameter to the collection
    ///
    /// Fails if the name is already taken, the expression does not parse, or
    /// the expression closes a dependency cycle.
    ///
    /// # Examples
    ///
    /// ```
    /// use astrovoigt_rs::parameters::{Parameter, Parameters};
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::new("v_rad_0", -11.0)).unwrap();
    /// assert!(params.add(Parameter::new("v_rad_0", 3.0)).is_err());
    /// assert_eq!(params.len(), 1);
    /// ```
    pub fn add(&mut self, param: Parameter) -> std::result::Result<usize, ParameterError> {
        let name = param.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ParameterError::DuplicateName { name });
        }
        if param.vary() && param.expr().is_some() {
            return Err(ParameterError::ExpressionAndVary { name });
        }

        let compiled = param.expr().map(|e| compile(&name, e)).transpose()?;
        let slot = self.params.len();
        self.params.push(param);
        self.compiled.push(compiled);
        self.index.insert(name, slot);

        if let Err(e) = self.rebuild_eval_order() {
            self.params.pop();
            self.compiled.pop();
            self.index.retain(|_, &mut i| i != slot);
            return Err(e);
        }

        Ok(slot)
    }

    /// Add an unbounded varying parameter
    pub fn add_param(&mut self, name: &str, value: f64) -> std::result::Result<usize, ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Add a varying parameter with bounds
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> std::result::Result<usize, ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?)
    }

    /// Add a parameter computed from an expression
    pub fn add_param_with_expr(
        &mut self,
        name: &str,
        value: f64,
        expr: &str,
    ) -> std::result::Result<usize, ParameterError> {
        self.add(Parameter::with_expr(name, value, expr))
    }

    /// Attach an expression to an existing parameter, or remove it with `None`
    ///
    /// The parameter's value is recomputed immediately. If the expression
    /// closes a cycle or cannot be evaluated, the parameter is left as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use astrovoigt_rs::parameters::Parameters;
    ///
    /// let mut params = Parameters::new();
    /// params.add_param("N_0_0", 7.0e12).unwrap();
    /// params.add_param("N_1_0", 1.0e10).unwrap();
    /// params.set_expr("N_1_0", Some("N_0_0 / 70")).unwrap();
    ///
    /// assert_eq!(params.get("N_1_0").unwrap().value(), 1.0e11);
    /// assert!(!params.get("N_1_0").unwrap().vary());
    /// ```
    pub fn set_expr(&mut self, name: &str, expr: Option<&str>) -> std::result::Result<(), ParameterError> {
        let slot = self
            .index_of(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?;

        let compiled = expr.map(|e| compile(name, e)).transpose()?;
        let previous_expr = self.params[slot].expr().map(str::to_string);
        let previous_vary = self.params[slot].vary();
        let previous_compiled = std::mem::replace(&mut self.compiled[slot], compiled);
        self.params[slot].set_expr(expr);

        if let Err(e) = self.rebuild_eval_order().and_then(|_| self.update_expressions()) {
            self.compiled[slot] = previous_compiled;
            self.params[slot].set_expr(previous_expr.as_deref());
            if previous_expr.is_none() {
                self.params[slot].set_vary(previous_vary)?;
            }
            self.rebuild_eval_order()?;
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index_of(name).map(|slot| &self.params[slot])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.index_of(name).map(move |slot| &mut self.params[slot])
    }

    /// Parameter stored at a slot returned by [`Parameters::add`]
    pub fn get_at(&self, slot: usize) -> Option<&Parameter> {
        self.params.get(slot)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Names of all parameters in insertion order
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    /// Parameters the optimizer is allowed to change
    pub fn varying(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.vary())
    }

    pub fn varying_names(&self) -> Vec<String> {
        self.varying().map(|p| p.name().to_string()).collect()
    }

    pub fn nvarys(&self) -> usize {
        self.varying().count()
    }

    /// External values of the varying parameters
    pub fn varying_values(&self) -> Vec<f64> {
        self.varying().map(Parameter::value).collect()
    }

    /// Internal (unbounded) values of the varying parameters
    pub fn varying_internal_values(&self) -> std::result::Result<Vec<f64>, ParameterError> {
        self.varying().map(Parameter::to_internal).collect()
    }

    /// Update the varying parameters from internal values, then re-evaluate expressions
    pub fn update_from_internal(&mut self, values: &[f64]) -> std::result::Result<(), ParameterError> {
        self.check_varying_len(values.len())?;

        for (param, &internal) in self.params.iter_mut().filter(|p| p.vary()).zip(values) {
            let external = param.from_internal(internal);
            param.set_value(external)?;
        }

        self.update_expressions()
    }

    /// Update the varying parameters from external values, then re-evaluate expressions
    pub fn update_from_external(&mut self, values: &[f64]) -> std::result::Result<(), ParameterError> {
        self.check_varying_len(values.len())?;

        for (param, &external) in self.params.iter_mut().filter(|p| p.vary()).zip(values) {
            param.set_value(external)?;
        }

        self.update_expressions()
    }

    /// Store standard errors for the varying parameters, in varying order
    pub fn set_varying_stderrs(&mut self, stderrs: &[Option<f64>]) -> std::result::Result<(), ParameterError> {
        self.check_varying_len(stderrs.len())?;

        for (param, &stderr) in self.params.iter_mut().filter(|p| p.vary()).zip(stderrs) {
            param.set_stderr(stderr);
        }
        Ok(())
    }

    /// Recompute every expression parameter from its references
    pub fn update_expressions(&mut self) -> std::result::Result<(), ParameterError> {
        for i in 0..self.eval_order.len() {
            let slot = self.eval_order[i];
            let value = match &self.compiled[slot] {
                Some(expr) => expr.evaluate(self).map_err(|e| ParameterError::ExpressionEvaluation {
                    name: self.params[slot].name().to_string(),
                    message: e.to_string(),
                })?,
                None => continue,
            };
            self.params[slot].set_value(value)?;
        }

        Ok(())
    }

    /// Evaluate an arbitrary expression against the current values
    pub fn eval_expression(&self, expr: &str) -> std::result::Result<f64, ParameterError> {
        compile("<expression>", expr)?
            .evaluate(self)
            .map_err(|e| ParameterError::ExpressionEvaluation {
                name: "<expression>".to_string(),
                message: e.to_string(),
            })
    }

    fn check_varying_len(&self, len: usize) -> std::result::Result<(), ParameterError> {
        let nvarys = self.nvarys();
        if len != nvarys {
            return Err(ParameterError::ExpressionEvaluation {
                name: "parameters".to_string(),
                message: format!("Expected {} values for varying parameters, got {}", nvarys, len),
            });
        }
        Ok(())
    }

    /// Depth-first topological sort of the expression slots
    fn rebuild_eval_order(&mut self) -> std::result::Result<(), ParameterError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Visiting,
            Done,
        }

        fn visit(
            slot: usize,
            params: &Parameters,
            marks: &mut [Mark],
            order: &mut Vec<usize>,
        ) -> std::result::Result<(), ParameterError> {
            match marks[slot] {
                Mark::Done => return Ok(()),
                Mark::Visiting => {
                    return Err(ParameterError::CircularDependency {
                        name: params.params[slot].name().to_string(),
                    })
                }
                Mark::New => {}
            }

            marks[slot] = Mark::Visiting;
            if let Some(expr) = &params.compiled[slot] {
                for var in expr.variables() {
                    // Unknown names surface as evaluation errors later.
                    if let Some(dep) = params.index_of(&var) {
                        visit(dep, params, marks, order)?;
                    }
                }
                order.push(slot);
            }
            marks[slot] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::New; self.params.len()];
        let mut order = Vec::new();
        for slot in 0..self.params.len() {
            visit(slot, self, &mut marks, &mut order)?;
        }

        self.eval_order = order;
        Ok(())
    }

    /// Serialize to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON string produced by [`Parameters::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Value stored at `slot`, as a crate error when the slot does not exist
    pub(crate) fn value_at(&self, slot: usize) -> Result<f64> {
        self.get_at(slot).map(Parameter::value).ok_or_else(|| {
            VoigtFitError::Configuration(format!(
                "parameter slot {} does not exist in a set of {} parameters",
                slot,
                self.len()
            ))
        })
    }
}

fn compile(name: &str, expr: &str) -> std::result::Result<Expression, ParameterError> {
    Expression::parse(expr).map_err(|e| ParameterError::ExpressionEvaluation {
        name: name.to_string(),
        message: e.to_string(),
    })
}

impl EvaluationContext for Parameters {
    fn get_variable(&self, name: &str) -> std::result::Result<f64, ExpressionError> {
        self.get(name)
            .map(Parameter::value)
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}

impl TryFrom<Vec<Parameter>> for Parameters {
    type Error = ParameterError;

    fn try_from(list: Vec<Parameter>) -> std::result::Result<Self, Self::Error> {
        let mut params = Parameters::new();
        for param in list {
            params.add(param)?;
        }
        Ok(params)
    }
}

impl From<Parameters> for Vec<Parameter> {
    fn from(params: Parameters) -> Self {
        params.params
    }
}
