//! Measurements on continuum-normalized spectra.

use ndarray::{s, Array1};

use crate::error::{Result, VoigtFitError};

/// Full width at half depth of the deepest absorption dip, in units of `x`.
///
/// Depth is measured from a unit continuum. Both half-depth crossings are
/// linearly interpolated; `None` if the spectrum has no dip or a crossing
/// falls outside the data.
pub fn measure_fwhm(x: &Array1<f64>, y: &Array1<f64>) -> Option<f64> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }

    let (i_min, y_min) = y
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, &v)| if v < best.1 { (i, v) } else { best });
    let depth = 1.0 - y_min;
    if !(depth > 0.0) {
        return None;
    }
    let half = 1.0 - 0.5 * depth;

    let crossing = |a: usize, b: usize| {
        let t = (half - y[a]) / (y[b] - y[a]);
        x[a] + t * (x[b] - x[a])
    };

    let left = (0..i_min).rev().find(|&i| y[i] >= half).map(|i| crossing(i, i + 1))?;
    let right = (i_min + 1..y.len()).find(|&i| y[i] >= half).map(|i| crossing(i - 1, i))?;
    Some(right - left)
}

/// Standard deviation of the first `n` flux values.
///
/// The start of a normalized spectrum is usually continuum, so its scatter
/// estimates the per-pixel noise.
pub fn estimate_noise(flux: &Array1<f64>, n: usize) -> Result<f64> {
    let n = n.min(flux.len());
    if n < 2 {
        return Err(VoigtFitError::InvalidInput(format!(
            "need at least two flux values to estimate noise, got {}",
            n
        )));
    }
    let head = flux.slice(s![..n]);
    Ok(head.std(0.0))
}

/// Per-point weights 1/σ for a constant noise level.
pub fn uniform_weights(n: usize, sigma: f64) -> Result<Array1<f64>> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Err(VoigtFitError::Configuration(format!(
            "noise level must be positive, got {}",
            sigma
        )));
    }
    Ok(Array1::from_elem(n, 1.0 / sigma))
}
