//! # astrovoigt-rs
//!
//! `astrovoigt-rs` synthesizes multi-component Voigt absorption spectra and
//! decides how many velocity components an observed absorption feature
//! needs.
//!
//! The library provides:
//! - A Voigt line kernel and optical depths for atomic and molecular transitions
//! - A synthesis engine that combines many lines, applies the instrumental
//!   resolution and resamples onto any wavelength grid
//! - Typed species, components and shared-velocity groups mapped onto a
//!   flat parameter set with bounds and expression constraints
//! - A Levenberg-Marquardt optimizer with lmfit-style statistics and
//!   uncertainties
//! - Model-order selection by BIC, AIC and reduced chi-square
//!
//! ## Basic Usage
//!
//! ```
//! use astrovoigt_rs::{AbsorptionModel, FitConfig, Model, SpeciesSpec};
//! use ndarray::Array1;
//!
//! let ch = SpeciesSpec::new("CH+")
//!     .with_transition(4232.548, 0.005, 1.0e8)
//!     .with_component(-11.0, 2.0, 1.4e13);
//! let model = AbsorptionModel::from_specs(&[ch], &FitConfig::default()).unwrap();
//!
//! let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
//! let flux = model.eval(&wavelength).unwrap();
//! assert!(flux.iter().cloned().fold(1.0, f64::min) < 1.0);
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

mod utils;

pub mod problem;

pub mod lm;

pub mod uncertainty;

pub mod model;

// Absorption physics and synthesis
pub mod constants;
pub mod profile;
pub mod species;
pub mod spectrum;

pub mod config;
pub mod expander;
pub mod absorption;
pub mod fit;
pub mod synthetic;

// Re-exports for convenience
pub use absorption::AbsorptionModel;
pub use config::{FitConfig, SelectorConfig, SynthesisConfig};
pub use error::{Result, VoigtFitError};
pub use fit::{FitResult, ModelOrderSelector, SelectionOutcome, Termination};
pub use lm::LevenbergMarquardt;
pub use model::{fit_model, Model, ModelFit};
pub use parameters::{Parameter, Parameters};
pub use problem::Problem;
pub use species::{Absorbers, SpeciesSpec};
pub use spectrum::SpectrumSynthesizer;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
