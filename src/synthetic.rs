//! Synthetic observations for exercising fits.

use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, VoigtFitError};

/// `flux` with independent Gaussian noise of standard deviation `sigma`.
///
/// `sigma` must be finite and non-negative; zero returns `flux` unchanged.
pub fn noisy_spectrum<R: Rng + ?Sized>(flux: &Array1<f64>, sigma: f64, rng: &mut R) -> Result<Array1<f64>> {
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(VoigtFitError::Configuration(format!(
            "noise level must be finite and non-negative, got {}",
            sigma
        )));
    }
    let normal = Normal::new(0.0, sigma).map_err(|e| {
        VoigtFitError::Configuration(format!("invalid noise level {}: {}", sigma, e))
    })?;
    Ok(flux.mapv(|f| f + normal.sample(rng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_noise_level() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let flux = Array1::ones(20_000);
        let noisy = noisy_spectrum(&flux, 0.01, &mut rng).unwrap();

        let residual = &noisy - &flux;
        assert_abs_diff_eq!(residual.mean().unwrap(), 0.0, epsilon = 5e-4);
        assert_abs_diff_eq!(residual.std(0.0), 0.01, epsilon = 5e-4);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let flux = Array1::ones(100);
        let a = noisy_spectrum(&flux, 0.01, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = noisy_spectrum(&flux, 0.01, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_sigma() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for sigma in [-1.0, f64::NAN, f64::INFINITY] {
            let err = noisy_spectrum(&Array1::ones(3), sigma, &mut rng);
            assert!(matches!(err, Err(VoigtFitError::Configuration(_))), "sigma = {}", sigma);
        }
    }

    #[test]
    fn test_zero_sigma_is_noise_free() {
        let flux = Array1::from_vec(vec![1.0, 0.7, 0.95]);
        let same = noisy_spectrum(&flux, 0.0, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(same, flux);
    }
}
