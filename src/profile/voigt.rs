//! Normalized Voigt line shape.
//!
//! The Voigt profile is the real part of the Faddeeva function
//! `w(z) = exp(−z²) erfc(−iz)` at `z = (x + iγ)/(σ√2)`, divided by `σ√(2π)`.
//! `w` is evaluated with Weideman's (1994) rational approximation, whose
//! coefficients are computed once per process.

use nalgebra::{Complex, ComplexField};
use ndarray::Array1;
use std::f64::consts::{PI, SQRT_2};
use std::sync::OnceLock;

/// Number of terms of the rational approximation.
const N_TERMS: usize = 32;

struct Weideman {
    /// Scale parameter L = sqrt(N/√2)
    l: f64,
    /// Polynomial coefficients a_1..a_N (lowest degree first)
    a: [f64; N_TERMS],
}

impl Weideman {
    fn compute() -> Self {
        let n = N_TERMS as f64;
        let l = (n / SQRT_2).sqrt();
        let m = 2 * N_TERMS;

        // g(k) sampled on the tangent mesh, even in k.
        let g = |k: usize| {
            let t = l * (k as f64 * PI / (2.0 * m as f64)).tan();
            (-t * t).exp() * (l * l + t * t)
        };
        let samples: Vec<f64> = (0..m).map(g).collect();

        let mut a = [0.0; N_TERMS];
        for (j, coefficient) in a.iter_mut().enumerate() {
            let order = (j + 1) as f64;
            let cosine_sum: f64 = samples[1..]
                .iter()
                .enumerate()
                .map(|(i, gk)| gk * ((i + 1) as f64 * order * PI / m as f64).cos())
                .sum();
            *coefficient = (samples[0] + 2.0 * cosine_sum) / (2.0 * m as f64);
        }

        Self { l, a }
    }

    fn get() -> &'static Weideman {
        static COEFFICIENTS: OnceLock<Weideman> = OnceLock::new();
        COEFFICIENTS.get_or_init(Weideman::compute)
    }
}

/// Faddeeva function `w(z)`.
///
/// Accurate to about 1e-10 relative in the upper half plane; the lower half
/// plane goes through `w(z) = 2 exp(−z²) − w(−z)`.
pub fn faddeeva(z: Complex<f64>) -> Complex<f64> {
    if z.im < 0.0 {
        return (-z * z).exp() * 2.0 - faddeeva(-z);
    }

    let weideman = Weideman::get();
    let l = Complex::new(weideman.l, 0.0);
    let iz = Complex::new(-z.im, z.re);
    let denom = l - iz;
    let big_z = (l + iz) / denom;

    let p = weideman
        .a
        .iter()
        .rev()
        .fold(Complex::new(0.0, 0.0), |acc, &a| acc * big_z + a);

    p * 2.0 / (denom * denom) + (1.0 / PI.sqrt()) / denom
}

/// Voigt profile at offset `x` for Gaussian σ and Lorentzian half-width γ.
///
/// Integrates to one over x. Returns NaN when `sigma` is not positive.
pub fn voigt(x: f64, sigma: f64, gamma: f64) -> f64 {
    if !(sigma > 0.0) {
        return f64::NAN;
    }
    let scale = sigma * SQRT_2;
    let re_w = if gamma == 0.0 {
        let u = x / scale;
        (-u * u).exp()
    } else {
        faddeeva(Complex::new(x / scale, gamma / scale)).re
    };
    re_w / (sigma * (2.0 * PI).sqrt())
}

/// [`voigt`] over an array of offsets.
pub fn voigt_profile(x: &Array1<f64>, sigma: f64, gamma: f64) -> Array1<f64> {
    x.mapv(|xi| voigt(xi, sigma, gamma))
}
