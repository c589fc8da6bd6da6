//! Model trait and least-squares fitting of models to data.
//!
//! A [`Model`] predicts data from a [`Parameters`] set. [`fit_model`] wraps it
//! in a weighted [`Problem`] over the internal values of the free
//! parameters, runs the Levenberg-Marquardt optimizer and reports the usual
//! goodness-of-fit statistics together with parameter uncertainties.

use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, VoigtFitError};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::parameters::Parameters;
use crate::problem::Problem;
use crate::uncertainty::{
    calculate_correlation, calculate_covariance, standard_errors, standard_errors_from_covariance,
};
use crate::utils::finite_difference::step_size;

/// Floor applied to chi-square before taking logarithms.
const CHISQR_FLOOR: f64 = 1e-250;

/// Relative step of the external-value Jacobian used for the covariance.
const COVARIANCE_EPSILON: f64 = 1e-6;

/// A trait representing a model that can be fit to data.
pub trait Model {
    /// Returns a reference to the model's parameters.
    fn parameters(&self) -> &Parameters;

    /// Returns a mutable reference to the model's parameters.
    fn parameters_mut(&mut self) -> &mut Parameters;

    /// Evaluate the model at `x` with the values held in `params`.
    ///
    /// `params` has the same layout as [`Model::parameters`]; the optimizer
    /// passes trial copies through here.
    fn eval_with(&self, params: &Parameters, x: &Array1<f64>) -> Result<Array1<f64>>;

    /// Evaluates the model at the given x values using the current parameter values.
    fn eval(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.eval_with(self.parameters(), x)
    }

    /// Calculates the residuals (y_obs - y_pred) using the current parameter values.
    fn residuals(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
        let y_pred = self.eval(x)?;

        if y.len() != y_pred.len() {
            return Err(VoigtFitError::DimensionMismatch(format!(
                "Expected {} observed values, got {}",
                y_pred.len(),
                y.len()
            )));
        }

        Ok(y - &y_pred)
    }

    /// Returns the number of varying parameters in the model.
    fn varying_parameter_count(&self) -> usize {
        self.parameters().nvarys()
    }

    /// Returns the names of all parameters in the model.
    fn parameter_names(&self) -> Vec<String> {
        self.parameters().names()
    }

    /// Returns the names of varying parameters in the model.
    fn varying_parameter_names(&self) -> Vec<String> {
        self.parameters().varying_names()
    }
}

/// An adapter that turns a [`Model`] and its data into a [`Problem`].
///
/// The problem's parameters are the internal (unbounded) values of the
/// model's free parameters; residuals are `(y − model) · w`.
pub struct ModelProblem<'a, M: Model + ?Sized> {
    model: &'a M,
    template: Parameters,
    x_data: &'a Array1<f64>,
    y_data: &'a Array1<f64>,
    weights: Option<&'a Array1<f64>>,
}

impl<'a, M: Model + ?Sized> ModelProblem<'a, M> {
    /// Create a new adapter.
    ///
    /// # Errors
    ///
    /// [`VoigtFitError::DimensionMismatch`] if `y_data` or `weights` do not
    /// match the length of `x_data`.
    pub fn new(
        model: &'a M,
        x_data: &'a Array1<f64>,
        y_data: &'a Array1<f64>,
        weights: Option<&'a Array1<f64>>,
    ) -> Result<Self> {
        if x_data.len() != y_data.len() {
            return Err(VoigtFitError::DimensionMismatch(format!(
                "Expected x and y data to have the same length, got {} and {}",
                x_data.len(),
                y_data.len()
            )));
        }
        if let Some(w) = weights {
            if w.len() != x_data.len() {
                return Err(VoigtFitError::DimensionMismatch(format!(
                    "Expected {} weights, got {}",
                    x_data.len(),
                    w.len()
                )));
            }
        }

        let mut template = model.parameters().clone();
        template.update_expressions()?;

        Ok(Self {
            model,
            template,
            x_data,
            y_data,
            weights,
        })
    }

    pub fn ndata(&self) -> usize {
        self.x_data.len()
    }

    pub fn nvarys(&self) -> usize {
        self.template.nvarys()
    }

    /// Internal values of the free parameters at the model's current state.
    pub fn initial_params(&self) -> Result<Array1<f64>> {
        Ok(Array1::from_vec(self.template.varying_internal_values()?))
    }

    /// Parameter set with the free parameters at `internal` values.
    pub fn parameters_from_internal(&self, internal: &Array1<f64>) -> Result<Parameters> {
        let mut params = self.template.clone();
        params.update_from_internal(&internal.to_vec())?;
        Ok(params)
    }

    /// Weighted residuals for a complete parameter set.
    pub fn residuals_for(&self, params: &Parameters) -> Result<Array1<f64>> {
        let model = self.model.eval_with(params, self.x_data)?;
        if model.len() != self.y_data.len() {
            return Err(VoigtFitError::DimensionMismatch(format!(
                "Model returned {} values for {} data points",
                model.len(),
                self.y_data.len()
            )));
        }

        let residual = self.y_data - &model;
        Ok(match self.weights {
            Some(w) => residual * w,
            None => residual,
        })
    }

    /// Jacobian of the weighted residuals with respect to the external
    /// values of the free parameters.
    ///
    /// Forward differences, stepping backwards for parameters that sit at
    /// their upper bound.
    pub fn external_jacobian(&self, params: &Parameters, residuals: &Array1<f64>) -> Result<Array2<f64>> {
        let free: Vec<_> = params.varying().map(|p| (p.value(), p.max())).collect();
        let values: Vec<f64> = free.iter().map(|(v, _)| *v).collect();
        let mut jac = Array2::zeros((residuals.len(), free.len()));

        for (j, &(value, max)) in free.iter().enumerate() {
            let mut h = step_size(value, COVARIANCE_EPSILON);
            if value + h > max {
                h = -h;
            }

            let mut shifted = values.clone();
            shifted[j] += h;
            let mut trial = params.clone();
            trial.update_from_external(&shifted)?;

            let column = (self.residuals_for(&trial)? - residuals) / h;
            jac.column_mut(j).assign(&column);
        }
        Ok(jac)
    }
}

impl<'a, M: Model + ?Sized> Problem for ModelProblem<'a, M> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let params = self.parameters_from_internal(params)?;
        self.residuals_for(&params)
    }

    fn parameter_count(&self) -> usize {
        self.nvarys()
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }
}

/// Result of fitting a model to data, with lmfit-style statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFit {
    /// Best-fit parameters, with standard errors on the free ones
    pub params: Parameters,

    /// Model evaluated at the best-fit parameters
    pub best_fit: Array1<f64>,

    /// Weighted residuals at the solution
    pub residual: Array1<f64>,

    pub chisqr: f64,
    pub redchi: f64,
    pub aic: f64,
    pub bic: f64,

    pub ndata: usize,
    pub nvarys: usize,
    pub nfree: usize,

    /// Whether the optimizer met a convergence criterion
    pub success: bool,
    pub message: String,
    pub iterations: usize,
    pub nfev: usize,

    /// Covariance of the free parameters, `None` when singular
    pub covariance: Option<Array2<f64>>,

    /// Names of the free parameters, in covariance order
    pub var_names: Vec<String>,
}

impl ModelFit {
    /// Standard error of a free parameter.
    pub fn stderr(&self, name: &str) -> Option<f64> {
        self.params.get(name)?.stderr()
    }

    /// Standard errors of all free parameters that have one, by name.
    pub fn stderrs(&self) -> HashMap<String, f64> {
        let errors: Vec<Option<f64>> = self.params.varying().map(|p| p.stderr()).collect();
        standard_errors(&errors, &self.params)
    }

    /// Correlation matrix of the free parameters, in `var_names` order.
    pub fn correlation(&self) -> Option<Array2<f64>> {
        self.covariance.as_ref().map(calculate_correlation)
    }
}

impl fmt::Display for ModelFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Statistics:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Function evaluations: {}", self.nfev)?;
        writeln!(f, "  Data points: {}", self.ndata)?;
        writeln!(f, "  Variables: {}", self.nvarys)?;
        writeln!(f, "  Chi-square: {:.6e}", self.chisqr)?;
        writeln!(f, "  Reduced chi-square: {:.6e}", self.redchi)?;
        writeln!(f, "  Akaike info crit: {:.4}", self.aic)?;
        writeln!(f, "  Bayesian info crit: {:.4}", self.bic)?;
        writeln!(f, "Variables:")?;
        for param in self.params.iter() {
            match (param.vary(), param.stderr(), param.expr()) {
                (true, Some(err), _) => writeln!(f, "  {}: {:.6e} +/- {:.3e}", param.name(), param.value(), err)?,
                (true, None, _) => writeln!(f, "  {}: {:.6e} +/- n/a", param.name(), param.value())?,
                (false, _, Some(expr)) => writeln!(f, "  {}: {:.6e} == '{}'", param.name(), param.value(), expr)?,
                (false, _, None) => writeln!(f, "  {}: {:.6e} (fixed)", param.name(), param.value())?,
            }
        }
        Ok(())
    }
}

/// Fit `model` to `(x, y)` with optional per-point weights (1/σ).
///
/// The model itself is left untouched; the best-fit parameters are returned
/// in the [`ModelFit`].
pub fn fit_model<M: Model + Sync + ?Sized>(
    model: &M,
    x: &Array1<f64>,
    y: &Array1<f64>,
    weights: Option<&Array1<f64>>,
    config: &LmConfig,
) -> Result<ModelFit> {
    if y.iter().any(|v| !v.is_finite()) {
        return Err(VoigtFitError::InvalidInput("data contains non-finite values".to_string()));
    }

    let problem = ModelProblem::new(model, x, y, weights)?;
    let initial = problem.initial_params()?;
    let result = LevenbergMarquardt::with_config(config.clone()).minimize(&problem, initial)?;

    let mut params = problem.parameters_from_internal(&result.params)?;
    let best_fit = model.eval_with(&params, x)?;
    let residual = result.residuals;

    let ndata = problem.ndata();
    let nvarys = problem.nvarys();
    let nfree = ndata.saturating_sub(nvarys);
    let chisqr = residual.iter().map(|r| r * r).sum::<f64>();
    let redchi = chisqr / nfree.max(1) as f64;
    let (aic, bic) = information_criteria(chisqr, ndata, nvarys);

    let covariance = if nvarys > 0 && nfree > 0 {
        let jac = problem.external_jacobian(&params, &residual)?;
        calculate_covariance(&jac, redchi)
    } else {
        None
    };
    let stderrs: Vec<Option<f64>> = match &covariance {
        Some(cov) => standard_errors_from_covariance(cov).to_vec(),
        None => vec![None; nvarys],
    };
    params.set_varying_stderrs(&stderrs)?;

    debug!(
        "fit finished: {} ({} iterations), chisqr = {:.4e}, redchi = {:.4}, bic = {:.3}",
        result.message, result.iterations, chisqr, redchi, bic
    );

    Ok(ModelFit {
        var_names: params.varying_names(),
        params,
        best_fit,
        residual,
        chisqr,
        redchi,
        aic,
        bic,
        ndata,
        nvarys,
        nfree,
        success: result.success,
        message: result.message,
        iterations: result.iterations,
        nfev: result.func_evals,
        covariance,
    })
}

/// Akaike and Bayesian information criteria, as lmfit defines them.
pub fn information_criteria(chisqr: f64, ndata: usize, nvarys: usize) -> (f64, f64) {
    let n = ndata.max(1) as f64;
    let k = nvarys as f64;
    let neg2_log_likelihood = n * (chisqr.max(CHISQR_FLOOR) / n).ln();
    (neg2_log_likelihood + 2.0 * k, neg2_log_likelihood + n.ln() * k)
}
