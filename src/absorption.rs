//! The absorption-line model: typed absorbers, their parameter set and the
//! synthesis engine behind one [`Model`].

use log::debug;
use ndarray::Array1;

use crate::config::FitConfig;
use crate::error::{Result, VoigtFitError};
use crate::expander::ParameterExpander;
use crate::fit::FitResult;
use crate::lm::LmConfig;
use crate::model::{fit_model, Model};
use crate::parameters::Parameters;
use crate::species::{Absorbers, SpeciesSpec};
use crate::spectrum::SpectrumSynthesizer;

/// Transmission model for a fixed set of species and components.
///
/// ```
/// use astrovoigt_rs::absorption::AbsorptionModel;
/// use astrovoigt_rs::config::FitConfig;
/// use astrovoigt_rs::species::SpeciesSpec;
/// use astrovoigt_rs::model::Model;
/// use ndarray::Array1;
///
/// let ti = SpeciesSpec::new("TiII")
///     .with_transition(3383.768, 0.358, 1.4e8)
///     .with_component(-5.0, 2.0, 5e11);
/// let model = AbsorptionModel::from_specs(&[ti], &FitConfig::default()).unwrap();
///
/// let wavelength = Array1::linspace(3382.5, 3385.0, 500);
/// let flux = model.eval(&wavelength).unwrap();
/// assert!(flux.iter().all(|&f| f > 0.0 && f <= 1.0));
/// ```
#[derive(Debug, Clone)]
pub struct AbsorptionModel {
    expander: ParameterExpander,
    synthesizer: SpectrumSynthesizer,
    optimizer: LmConfig,
    parameters: Parameters,
    ties: Vec<(String, String)>,
}

impl AbsorptionModel {
    /// Build the model and its starting parameters from `absorbers`.
    pub fn new(absorbers: Absorbers, config: &FitConfig) -> Result<Self> {
        config.validate()?;
        let expander = ParameterExpander::new(absorbers, &config.components)?;
        let parameters = expander.parameters()?;

        Ok(Self {
            expander,
            synthesizer: SpectrumSynthesizer::new(config.synthesis),
            optimizer: config.optimizer.clone(),
            parameters,
            ties: Vec::new(),
        })
    }

    pub fn from_specs(specs: &[SpeciesSpec], config: &FitConfig) -> Result<Self> {
        Self::new(Absorbers::from_specs(specs)?, config)
    }

    pub fn expander(&self) -> &ParameterExpander {
        &self.expander
    }

    pub fn synthesizer(&self) -> &SpectrumSynthesizer {
        &self.synthesizer
    }

    /// Constrain parameter `name` to the expression `expr`.
    ///
    /// The parameter stops being free; its value follows the expression at
    /// every evaluation, e.g. `tie("N_1_0", "N_0_0 / 70")`.
    pub fn tie(&mut self, name: &str, expr: &str) -> Result<()> {
        self.parameters.set_expr(name, Some(expr))?;
        self.parameters.update_expressions()?;
        self.ties.retain(|(n, _)| n != name);
        self.ties.push((name.to_string(), expr.to_string()));
        Ok(())
    }

    /// Expression constraints added with [`AbsorptionModel::tie`].
    pub fn ties(&self) -> &[(String, String)] {
        &self.ties
    }

    /// Replace the parameter values, e.g. with a previous fit's result.
    ///
    /// The set must have this model's layout.
    pub fn set_parameters(&mut self, parameters: Parameters) -> Result<()> {
        if parameters.names() != self.parameters.names() {
            return Err(VoigtFitError::Configuration(format!(
                "parameter set does not match the model layout ({} vs {} entries)",
                parameters.len(),
                self.parameters.len()
            )));
        }
        self.parameters = parameters;
        Ok(())
    }

    /// Absorbers with the current parameter values.
    pub fn absorbers(&self) -> Result<Absorbers> {
        self.expander.resolve(&self.parameters)
    }

    /// Fit this model at its fixed component count.
    ///
    /// `weights` are per-point 1/σ; `None` weights every point equally.
    pub fn fit(&self, wavelength: &Array1<f64>, flux: &Array1<f64>, weights: Option<&Array1<f64>>) -> Result<FitResult> {
        debug!(
            "fitting {} components over {} species ({} free parameters)",
            self.expander.absorbers().total_components(),
            self.expander.absorbers().species.len(),
            self.parameters.nvarys()
        );
        let fit = fit_model(self, wavelength, flux, weights, &self.optimizer)?;
        FitResult::new(fit, &self.expander)
    }
}

impl Model for AbsorptionModel {
    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    fn eval_with(&self, params: &Parameters, x: &Array1<f64>) -> Result<Array1<f64>> {
        let lines = self.expander.expand(params)?;
        self.synthesizer.synthesize(x, &lines)
    }
}
