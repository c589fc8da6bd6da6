//! Single-line physics: the Voigt kernel, optical depth and the per-line
//! velocity grid.

pub mod optical_depth;
pub mod velocity_grid;
pub mod voigt;

pub use optical_depth::optical_depth;
pub use velocity_grid::{characteristic_width, voigt_fwhm, VelocityGrid};
pub use voigt::{faddeeva, voigt, voigt_profile};
