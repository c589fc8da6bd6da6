//! Spectrum synthesis and the numerical helpers it is built from.

pub mod analysis;
pub mod interpolate;
pub mod smoothing;
pub mod synthesizer;

pub use analysis::{estimate_noise, measure_fwhm, uniform_weights};
pub use interpolate::{interp_linear, CubicSpline};
pub use smoothing::gaussian_filter1d;
pub use synthesizer::{SpectrumSynthesizer, MAX_REFERENCE_POINTS};
