//! Physical constants used by the synthesis engine.
//!
//! CGS units, with wavelengths in Ångström and velocities in km/s.

use std::f64::consts::PI;

/// Speed of light [km/s].
pub const C_KMS: f64 = 299_792.458;

/// Speed of light [Å/s].
pub const C_ANGSTROM: f64 = 2.997_924_58e18;

/// Speed of light [cm/s].
pub const C_CMS: f64 = 2.997_924_58e10;

/// Elementary charge [esu].
pub const ELECTRON_CHARGE: f64 = 4.803_204_712_570_263e-10;

/// Electron mass [g].
pub const ELECTRON_MASS: f64 = 9.109_383_701_5e-28;

/// Classical absorption cross-section per unit oscillator strength, π e² / (m_e c) [cm² Hz].
pub const CROSS_SECTION: f64 = PI * ELECTRON_CHARGE * ELECTRON_CHARGE / (ELECTRON_MASS * C_CMS);

/// km/s · (1/Å) → Hz.
pub const KMS_PER_ANGSTROM_TO_HZ: f64 = 1e13;

/// Gaussian width factor applied to b in the Voigt FWHM approximation.
pub const GAUSSIAN_FWHM_PER_B: f64 = 2.354_82;

/// FWHM of a Gaussian in units of its standard deviation, 2√(2 ln 2).
pub const GAUSSIAN_FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

/// Half width of every line support, in characteristic widths.
pub const SUPPORT_HALF_WIDTHS: f64 = 8.5;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_speed_of_light_units_agree() {
        assert_relative_eq!(C_KMS * 1e13, C_ANGSTROM, max_relative = 1e-15);
        assert_relative_eq!(C_KMS * 1e5, C_CMS, max_relative = 1e-15);
    }

    #[test]
    fn test_cross_section() {
        assert_relative_eq!(CROSS_SECTION, 0.026_54, max_relative = 1e-3);
    }
}
