//! Integration tests for astrovoigt-rs
//!
//! This file organizes and includes all test modules for the library.

// Spectrum synthesis properties and scenarios
mod synthesis;

// Parameter system
mod parameters;

// Fitting, parameter expansion and component selection
mod fitting;

/// Test helpers - common spectra and species for tests
pub mod test_helpers {
    use astrovoigt_rs::species::SpeciesSpec;
    use ndarray::Array1;

    /// CH+ λ4232 with one component at -11 km/s.
    pub fn ch_plus(n: f64) -> SpeciesSpec {
        SpeciesSpec::new("12CH+")
            .with_transition(4232.548, 0.005, 1.0e8)
            .with_component(-11.0, 2.0, n)
    }

    /// Ca I λ4227 without components.
    pub fn calcium() -> SpeciesSpec {
        SpeciesSpec::new("CaI").with_transition(4226.728, 1.77, 2.2e8)
    }

    /// Index and value of the smallest sample.
    pub fn minimum(values: &Array1<f64>) -> (usize, f64) {
        values
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, &v)| if v < best.1 { (i, v) } else { best })
    }

    /// Convert a velocity width [km/s] to a wavelength width [Å] at `lambda`.
    pub fn velocity_to_wavelength(width: f64, lambda: f64) -> f64 {
        width / astrovoigt_rs::constants::C_KMS * lambda
    }
}
