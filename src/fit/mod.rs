//! Fitting absorbers to observed spectra and choosing how many components
//! the data support.

mod guess;
mod result;
mod selector;

pub use guess::{initial_guess, reference_wavelength, velocity_at, wavelength_at};
pub use result::{ComponentFit, FitResult, SpeciesFit};
pub use selector::{ModelOrderSelector, SelectionOutcome, SelectionStep, Termination};
