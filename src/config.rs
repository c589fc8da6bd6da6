//! Run configuration.
//!
//! Every section has defaults matching the usual optical absorption-line
//! setup (3 km/s resolution, 25 samples per width) and can be loaded from
//! JSON with missing fields filled in.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VoigtFitError};
use crate::lm::LmConfig;

/// Sampling and instrument settings of the synthesis engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Instrument resolution (FWHM) [km/s]. Zero disables smoothing.
    pub v_resolution: f64,

    /// Samples per characteristic width
    pub n_step: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            v_resolution: 3.0,
            n_step: 25,
        }
    }
}

impl SynthesisConfig {
    pub fn with_v_resolution(mut self, v_resolution: f64) -> Self {
        self.v_resolution = v_resolution;
        self
    }

    pub fn with_n_step(mut self, n_step: usize) -> Self {
        self.n_step = n_step;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.v_resolution.is_finite() && self.v_resolution >= 0.0) {
            return Err(VoigtFitError::Configuration(format!(
                "v_resolution must be finite and non-negative, got {}",
                self.v_resolution
            )));
        }
        if self.n_step == 0 {
            return Err(VoigtFitError::Configuration("n_step must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Starting values and bounds for components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentDefaults {
    /// Doppler width of a new component [km/s]
    pub b: f64,

    /// Column density of a new component [cm⁻²]
    pub n: f64,

    /// Doppler width once more than `reduce_after` components exist
    pub reduced_b: f64,

    /// Column density once more than `reduce_after` components exist
    pub reduced_n: f64,

    pub reduce_after: usize,

    /// Lower bound on every Doppler width
    pub b_min: f64,

    /// Upper bound on every Doppler width
    pub b_max: f64,
}

impl Default for ComponentDefaults {
    fn default() -> Self {
        Self {
            b: 0.85,
            n: 7.5e10,
            reduced_b: 0.45,
            reduced_n: 1e10,
            reduce_after: 5,
            b_min: 0.5,
            b_max: 5.5,
        }
    }
}

impl ComponentDefaults {
    /// (b, N) for a new component when the model will hold `count` components.
    pub fn for_count(&self, count: usize) -> (f64, f64) {
        let (b, n) = if count > self.reduce_after {
            (self.reduced_b, self.reduced_n)
        } else {
            (self.b, self.n)
        };
        (b.clamp(self.b_min, self.b_max), n)
    }

    pub fn with_b_bounds(mut self, b_min: f64, b_max: f64) -> Self {
        self.b_min = b_min;
        self.b_max = b_max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.b_min > 0.0 && self.b_min < self.b_max) {
            return Err(VoigtFitError::Configuration(format!(
                "Doppler width bounds must satisfy 0 < b_min < b_max, got [{}, {}]",
                self.b_min, self.b_max
            )));
        }
        if !(self.b > 0.0 && self.reduced_b > 0.0 && self.n >= 0.0 && self.reduced_n >= 0.0) {
            return Err(VoigtFitError::Configuration(
                "default b must be positive and default N non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the first component is placed when no species supplies one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitialGuess {
    /// Wavelength of the minimum flux
    #[default]
    DeepestPoint,

    /// Absorption-weighted centroid Σ(1−F)λ / Σ(1−F)
    Centroid,
}

/// Settings of the add-component loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub max_components: usize,

    /// Components of one species closer than this are degenerate [km/s]
    pub min_separation: f64,

    /// Minimum N/σ_N of every free column density
    pub min_significance: f64,

    /// Outward padding of the residual boundaries [km/s]
    pub boundary_pad: f64,

    pub initial_guess: InitialGuess,

    /// Wavelength used to convert positions to velocities [Å]. Defaults to
    /// the strongest transition of the first species.
    pub reference_wavelength: Option<f64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_components: 8,
            min_separation: 1.5,
            min_significance: 3.0,
            boundary_pad: 3.5,
            initial_guess: InitialGuess::default(),
            reference_wavelength: None,
        }
    }
}

impl SelectorConfig {
    pub fn with_max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    pub fn with_min_separation(mut self, min_separation: f64) -> Self {
        self.min_separation = min_separation;
        self
    }

    pub fn with_min_significance(mut self, min_significance: f64) -> Self {
        self.min_significance = min_significance;
        self
    }

    pub fn with_initial_guess(mut self, initial_guess: InitialGuess) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    pub fn with_reference_wavelength(mut self, lambda: f64) -> Self {
        self.reference_wavelength = Some(lambda);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_components == 0 {
            return Err(VoigtFitError::Configuration(
                "max_components must be at least 1".to_string(),
            ));
        }
        if self.min_separation < 0.0 || self.min_significance < 0.0 || self.boundary_pad < 0.0 {
            return Err(VoigtFitError::Configuration(
                "selector thresholds must be non-negative".to_string(),
            ));
        }
        if let Some(lambda) = self.reference_wavelength {
            if !(lambda > 0.0 && lambda.is_finite()) {
                return Err(VoigtFitError::Configuration(format!(
                    "reference wavelength must be positive, got {}",
                    lambda
                )));
            }
        }
        Ok(())
    }
}

/// Everything a fitting run needs besides the data and the species.
///
/// ```
/// use astrovoigt_rs::config::FitConfig;
///
/// let config = FitConfig::from_json(r#"{ "synthesis": { "v_resolution": 6.0 } }"#).unwrap();
/// assert_eq!(config.synthesis.v_resolution, 6.0);
/// assert_eq!(config.synthesis.n_step, 25);
/// assert_eq!(config.selector.max_components, 8);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub synthesis: SynthesisConfig,
    pub components: ComponentDefaults,
    pub selector: SelectorConfig,
    pub optimizer: LmConfig,
}

impl FitConfig {
    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        self.synthesis = synthesis;
        self
    }

    pub fn with_components(mut self, components: ComponentDefaults) -> Self {
        self.components = components;
        self
    }

    pub fn with_selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_optimizer(mut self, optimizer: LmConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.synthesis.validate()?;
        self.components.validate()?;
        self.selector.validate()?;
        if self.optimizer.max_iterations == 0 {
            return Err(VoigtFitError::Configuration(
                "optimizer max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: FitConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(FitConfig::default().validate().is_ok());
    }

    #[test]
    fn test_reduced_defaults_after_five_components() {
        let defaults = ComponentDefaults::default();
        assert_eq!(defaults.for_count(5), (0.85, 7.5e10));
        assert_eq!(defaults.for_count(6), (0.5, 1e10));
    }

    #[test]
    fn test_invalid_sections() {
        let config = FitConfig::default().with_synthesis(SynthesisConfig::default().with_n_step(0));
        assert!(matches!(config.validate(), Err(VoigtFitError::Configuration(_))));

        let config = FitConfig::default().with_components(ComponentDefaults::default().with_b_bounds(2.0, 1.0));
        assert!(config.validate().is_err());

        assert!(FitConfig::from_json(r#"{ "selector": { "max_components": 0 } }"#).is_err());
        assert!(FitConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = FitConfig::default()
            .with_selector(SelectorConfig::default().with_initial_guess(InitialGuess::Centroid));
        let back = FitConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back.selector, config.selector);
        assert_eq!(back.synthesis, config.synthesis);
    }
}
