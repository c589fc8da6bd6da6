//! Seeding components from the data.

use ndarray::Array1;

use crate::config::{ComponentDefaults, InitialGuess, SelectorConfig};
use crate::constants::C_KMS;
use crate::error::{Result, VoigtFitError};
use crate::species::{Absorbers, Cloud};

/// Radial velocity [km/s] at which `reference` is observed at `wavelength`.
pub fn velocity_at(wavelength: f64, reference: f64) -> f64 {
    C_KMS * (wavelength / reference - 1.0)
}

/// Wavelength [Å] at which `reference` is observed at velocity `v_rad`.
pub fn wavelength_at(v_rad: f64, reference: f64) -> f64 {
    reference * (1.0 + v_rad / C_KMS)
}

/// Wavelength used for velocity conversions.
///
/// The configured value if set, otherwise the transition of the first
/// species with the largest oscillator strength.
pub fn reference_wavelength(absorbers: &Absorbers, config: &SelectorConfig) -> Result<f64> {
    if let Some(lambda) = config.reference_wavelength {
        return Ok(lambda);
    }
    absorbers
        .species
        .first()
        .and_then(|species| {
            species
                .transitions
                .iter()
                .fold(None, |best: Option<(f64, f64)>, t| match best {
                    Some((f, _)) if f >= t.f => best,
                    _ => Some((t.f, t.lambda0)),
                })
        })
        .map(|(_, lambda0)| lambda0)
        .ok_or_else(|| VoigtFitError::Configuration("no transitions to take a reference wavelength from".to_string()))
}

/// Single-component starting point taken from the data.
///
/// The velocity comes from the deepest sample or from the absorption-weighted
/// centroid; b and N are the defaults for a one-component model. A spectrum
/// with no absorption for the centroid to weigh falls back to the deepest
/// sample.
pub fn initial_guess(
    wavelength: &Array1<f64>,
    flux: &Array1<f64>,
    reference: f64,
    method: InitialGuess,
    defaults: &ComponentDefaults,
) -> Result<Cloud> {
    if wavelength.len() != flux.len() {
        return Err(VoigtFitError::DimensionMismatch(format!(
            "wavelength has {} samples, flux has {}",
            wavelength.len(),
            flux.len()
        )));
    }
    if wavelength.is_empty() {
        return Err(VoigtFitError::InvalidInput("cannot guess a component from an empty spectrum".to_string()));
    }

    let deepest = || {
        let (i, _) = flux
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, &f)| if f < best.1 { (i, f) } else { best });
        wavelength[i]
    };

    let lambda = match method {
        InitialGuess::DeepestPoint => deepest(),
        InitialGuess::Centroid => {
            let (weighted, total) = wavelength
                .iter()
                .zip(flux)
                .map(|(&l, &f)| ((1.0 - f).max(0.0), l))
                .fold((0.0, 0.0), |(wl, w), (depth, l)| (wl + depth * l, w + depth));
            if total > 0.0 {
                weighted / total
            } else {
                deepest()
            }
        }
    };

    let (b, n) = defaults.for_count(1);
    Ok(Cloud::new(velocity_at(lambda, reference), b, n))
}
