//! Optical depth of one transition seen through one cloud.

use log::warn;
use ndarray::Array1;
use std::f64::consts::{PI, SQRT_2};

use super::voigt::voigt;
use crate::constants::{CROSS_SECTION, C_ANGSTROM, C_KMS, KMS_PER_ANGSTROM_TO_HZ};
use crate::error::{Result, VoigtFitError};
use crate::species::{Cloud, Transition};

/// Negative values smaller than this fraction of the peak are rounding.
const NEGATIVE_TOLERANCE: f64 = 1e-10;

/// Optical depth τ(λ) at the given wavelengths [Å].
///
/// The profile is evaluated in frequency around the Doppler-shifted line
/// centre, with Gaussian σ from `b` and Lorentzian half-width γ/(4π).
///
/// # Errors
///
/// [`VoigtFitError::Configuration`] for a non-positive Doppler width, and
/// [`VoigtFitError::DomainAssumption`] if τ comes out negative beyond rounding.
pub fn optical_depth(wavelength: &Array1<f64>, transition: &Transition, cloud: &Cloud) -> Result<Array1<f64>> {
    if !(cloud.b > 0.0) {
        return Err(VoigtFitError::Configuration(format!(
            "Doppler width must be positive, got {}",
            cloud.b
        )));
    }

    let nu_center = C_ANGSTROM / (transition.lambda0 * (1.0 + cloud.v_rad / C_KMS));
    let sigma = cloud.b * KMS_PER_ANGSTROM_TO_HZ / transition.lambda0 / SQRT_2;
    let gamma = transition.gamma / (4.0 * PI);
    let scale = cloud.n * CROSS_SECTION * transition.f;

    let mut tau = wavelength.mapv(|lambda| scale * voigt(C_ANGSTROM / lambda - nu_center, sigma, gamma));

    let peak = tau.iter().cloned().fold(0.0_f64, f64::max);
    let floor = -NEGATIVE_TOLERANCE * peak;
    if let Some(bad) = tau.iter().find(|t| t.is_nan() || **t < floor) {
        warn!(
            "optical depth of {:.3} Å at v = {:.2} km/s evaluated to {}",
            transition.lambda0, cloud.v_rad, bad
        );
        return Err(VoigtFitError::DomainAssumption(format!(
            "negative or undefined optical depth {} for the line at {} Å",
            bad, transition.lambda0
        )));
    }
    tau.mapv_inplace(|t| t.max(0.0));

    Ok(tau)
}
