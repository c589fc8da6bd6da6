//! Multi-line transmission spectra.
//!
//! All lines are evaluated on their own velocity grids, interpolated onto
//! one shared reference grid, summed in optical depth, smoothed with the
//! instrumental Gaussian and resampled onto the caller's wavelengths.

use log::trace;
use ndarray::Array1;

use super::interpolate::{interp_linear, CubicSpline};
use super::smoothing::gaussian_filter1d;
use crate::config::SynthesisConfig;
use crate::constants::{C_KMS, GAUSSIAN_FWHM_PER_SIGMA, SUPPORT_HALF_WIDTHS};
use crate::error::{Result, VoigtFitError};
use crate::profile::{characteristic_width, optical_depth, voigt_fwhm, VelocityGrid};
use crate::species::{Line, LineList};

/// Largest reference grid the synthesizer will allocate.
pub const MAX_REFERENCE_POINTS: usize = 4_000_000;

/// Minimum samples per characteristic width of the reference grid.
const MIN_N_STEP: usize = 7;

/// Uniform wavelength grid shared by all lines of one evaluation.
#[derive(Debug, Clone)]
struct ReferenceGrid {
    start: f64,
    /// Wavelength spacing [Å]
    spacing: f64,
    /// Velocity spacing at `start` [km/s]
    step: f64,
    /// Samples per characteristic width, after raising to the data sampling.
    /// Per-line grids use the same density.
    n_step: usize,
    wavelength: Vec<f64>,
}

impl ReferenceGrid {
    /// Indices of the grid points inside `[lo, hi]`.
    fn index_range(&self, lo: f64, hi: f64) -> std::ops::Range<usize> {
        let n = self.wavelength.len();
        let first = ((lo - self.start) / self.spacing).ceil().max(0.0) as usize;
        let last = ((hi - self.start) / self.spacing).floor();
        if last < 0.0 {
            return 0..0;
        }
        let end = (last as usize + 1).min(n);
        first.min(end)..end
    }
}

/// Turns a line list into a transmission spectrum.
#[derive(Debug, Clone, Default)]
pub struct SpectrumSynthesizer {
    config: SynthesisConfig,
}

impl SpectrumSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Transmission at every wavelength of `wavelength` [Å].
    ///
    /// The output has the input's length and lies in `[0, 1]`; samples that
    /// no line reaches are exactly 1. `wavelength` must be ascending.
    ///
    /// # Errors
    ///
    /// - [`VoigtFitError::Configuration`] for an unsorted grid or an invalid line.
    /// - [`VoigtFitError::DomainAssumption`] if a line's optical depth is
    ///   negative or the reference grid would be unreasonably large.
    pub fn synthesize(&self, wavelength: &Array1<f64>, lines: &LineList) -> Result<Array1<f64>> {
        self.config.validate()?;
        let ones = Array1::ones(wavelength.len());
        if wavelength.is_empty() || lines.is_empty() {
            return Ok(ones);
        }
        check_ascending(wavelength)?;

        let v_res = self.config.v_resolution;
        let mut widths = Vec::with_capacity(lines.len());
        for line in lines.iter() {
            line.transition.validate()?;
            line.cloud.validate()?;
            widths.push(characteristic_width(&line.transition, line.cloud.b, v_res));
        }

        let Some(grid) = self.reference_grid(wavelength, lines, &widths)? else {
            trace!("no line overlaps {:.3}-{:.3} Å", wavelength[0], wavelength[wavelength.len() - 1]);
            return Ok(ones);
        };
        trace!(
            "reference grid: {} points, step {:.4} km/s, {} lines",
            grid.wavelength.len(),
            grid.step,
            lines.len()
        );

        let mut tau = vec![0.0; grid.wavelength.len()];
        for (line, &width) in lines.iter().zip(&widths) {
            if line.cloud.n == 0.0 {
                continue;
            }
            self.accumulate_line(&line, width, &grid, &mut tau)?;
        }

        // Smoothing the absorption depth keeps unabsorbed samples at exactly 1.
        let depth: Vec<f64> = tau.iter().map(|t| -(-t).exp_m1()).collect();
        let depth = if v_res > 0.0 {
            let sigma_pix = v_res / GAUSSIAN_FWHM_PER_SIGMA / grid.step;
            gaussian_filter1d(&depth, sigma_pix)
        } else {
            depth
        };
        let transmission: Vec<f64> = depth.iter().map(|d| 1.0 - d).collect();

        let resampled = interp_linear(wavelength, &grid.wavelength, &transmission, 1.0);
        Ok(resampled.mapv(|t| t.min(1.0)))
    }

    fn reference_grid(
        &self,
        wavelength: &Array1<f64>,
        lines: &LineList,
        widths: &[f64],
    ) -> Result<Option<ReferenceGrid>> {
        let data_lo = wavelength[0];
        let data_hi = wavelength[wavelength.len() - 1];

        // Narrowest feature, never coarser than the instrument resolution.
        let mut w_min = lines
            .iter()
            .map(|l| voigt_fwhm(l.transition.lambda0, l.transition.gamma, l.cloud.b))
            .fold(f64::INFINITY, f64::min);
        let v_res = self.config.v_resolution;
        if v_res > 0.0 {
            w_min = w_min.min(v_res);
        }

        let target = if v_res > 0.0 { v_res } else { w_min };
        let mut n_step = self.config.n_step.max(MIN_N_STEP);
        if let Some(dv_data) = data_velocity_spacing(wavelength) {
            n_step = n_step.max((target / dv_data).ceil() as usize);
        }
        let step = w_min / n_step as f64;

        let (support_lo, support_hi) = lines.iter().zip(widths).fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), (line, &width)| {
                let (a, b) = line_support(&line, width);
                (lo.min(a), hi.max(b))
            },
        );
        let lo = support_lo.max(data_lo);
        let hi = support_hi.min(data_hi);
        if !(hi > lo) {
            return Ok(None);
        }

        let spacing = lo * step / C_KMS;
        let count = ((hi - lo) / spacing).floor() + 1.0;
        if !count.is_finite() || count > MAX_REFERENCE_POINTS as f64 {
            return Err(VoigtFitError::DomainAssumption(format!(
                "reference grid of {} points exceeds the limit of {}",
                count, MAX_REFERENCE_POINTS
            )));
        }
        let count = count as usize;
        if count < 2 {
            return Ok(None);
        }

        Ok(Some(ReferenceGrid {
            start: lo,
            spacing,
            step,
            n_step,
            wavelength: (0..count).map(|i| lo * (1.0 + i as f64 * step / C_KMS)).collect(),
        }))
    }

    /// Add one line's optical depth, spline-interpolated inside its own
    /// support and zero outside it.
    fn accumulate_line(&self, line: &Line, width: f64, grid: &ReferenceGrid, tau: &mut [f64]) -> Result<()> {
        let lambda0 = line.transition.lambda0;
        let line_wavelength = line_grid(line, width, grid.n_step);
        let line_tau = optical_depth(&line_wavelength, &line.transition, &line.cloud)?;

        let spline = CubicSpline::natural(&line_wavelength.to_vec(), &line_tau.to_vec())
            .map_err(|e| VoigtFitError::DomainAssumption(format!("line grid at {} Å: {}", lambda0, e)))?;

        let range = grid.index_range(spline.x_min(), spline.x_max());
        let values = spline.eval_sorted(&grid.wavelength[range.clone()], 0.0);
        for (t, v) in tau[range].iter_mut().zip(values) {
            // Spline overshoot near the wings, not a physical τ.
            *t += v.max(0.0);
        }
        Ok(())
    }
}

/// Wavelengths of one line's own sampling grid.
fn line_grid(line: &Line, width: f64, n_step: usize) -> Array1<f64> {
    let lambda0 = line.transition.lambda0;
    let v_rad = line.cloud.v_rad;
    VelocityGrid::new(width, n_step)
        .map(|u| lambda0 * (1.0 + (v_rad + u) / C_KMS))
        .collect()
}

/// Wavelength interval a line's grid covers.
fn line_support(line: &Line, width: f64) -> (f64, f64) {
    let lambda0 = line.transition.lambda0;
    let v = line.cloud.v_rad;
    (
        lambda0 * (1.0 + (v - SUPPORT_HALF_WIDTHS * width) / C_KMS),
        lambda0 * (1.0 + (v + SUPPORT_HALF_WIDTHS * width) / C_KMS),
    )
}

/// Median pixel size of the data in km/s.
fn data_velocity_spacing(wavelength: &Array1<f64>) -> Option<f64> {
    if wavelength.len() < 2 {
        return None;
    }
    let mut diffs: Vec<f64> = wavelength.windows(2).into_iter().map(|w| w[1] - w[0]).collect();
    diffs.sort_by(|a, b| a.total_cmp(b));
    let mid = diffs.len() / 2;
    let median = if diffs.len() % 2 == 0 {
        0.5 * (diffs[mid - 1] + diffs[mid])
    } else {
        diffs[mid]
    };
    let mean = wavelength.mean()?;
    let dv = median / mean * C_KMS;
    (dv > 0.0 && dv.is_finite()).then_some(dv)
}

fn check_ascending(wavelength: &Array1<f64>) -> Result<()> {
    if wavelength.iter().any(|l| !l.is_finite()) {
        return Err(VoigtFitError::Configuration(
            "wavelength grid contains non-finite values".to_string(),
        ));
    }
    if wavelength.windows(2).into_iter().any(|w| w[1] < w[0]) {
        return Err(VoigtFitError::Configuration(
            "wavelength grid must be ascending".to_string(),
        ));
    }
    Ok(())
}
