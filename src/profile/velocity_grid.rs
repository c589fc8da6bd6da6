//! Per-line sampling grids in velocity space.

use crate::constants::{GAUSSIAN_FWHM_PER_B, SUPPORT_HALF_WIDTHS};
use crate::species::Transition;

/// Voigt FWHM in km/s from the empirical approximation
/// `0.5·L + sqrt(L²/4 + G²)`, with `L = 2γλ₀·1e-13` and `G = 2.35482·b`.
///
/// ```
/// use astrovoigt_rs::profile::voigt_fwhm;
///
/// // Pure Gaussian
/// let fwhm = voigt_fwhm(4232.548, 0.0, 2.0);
/// assert!((fwhm - 2.0 * 2.35482).abs() < 1e-12);
/// ```
pub fn voigt_fwhm(lambda0: f64, gamma: f64, b: f64) -> f64 {
    let fwhm_l = 2.0 * gamma * lambda0 * 1e-13;
    let fwhm_g = GAUSSIAN_FWHM_PER_B * b;
    0.5 * fwhm_l + (fwhm_l * fwhm_l / 4.0 + fwhm_g * fwhm_g).sqrt()
}

/// Width a line grid has to resolve: the larger of the line's Voigt FWHM
/// and the instrument resolution.
pub fn characteristic_width(transition: &Transition, b: f64, v_resolution: f64) -> f64 {
    voigt_fwhm(transition.lambda0, transition.gamma, b).max(v_resolution)
}

/// Velocity offsets from line centre, `−8.5·W + i·W/n_step` for
/// `i in 0..17·n_step`.
#[derive(Debug, Clone)]
pub struct VelocityGrid {
    start: f64,
    step: f64,
    index: usize,
    len: usize,
}

impl VelocityGrid {
    pub fn new(width: f64, n_step: usize) -> Self {
        let len = (2.0 * SUPPORT_HALF_WIDTHS) as usize * n_step;
        Self {
            start: -SUPPORT_HALF_WIDTHS * width,
            step: if n_step > 0 { width / n_step as f64 } else { 0.0 },
            index: 0,
            len,
        }
    }

    /// Grid for one line at the given instrument resolution.
    pub fn for_line(transition: &Transition, b: f64, v_resolution: f64, n_step: usize) -> Self {
        Self::new(characteristic_width(transition, b, v_resolution), n_step)
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

impl Iterator for VelocityGrid {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.len {
            return None;
        }
        let v = self.start + self.index as f64 * self.step;
        self.index += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VelocityGrid {}
