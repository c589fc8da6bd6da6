//! Interpolation on sorted abscissae.

use ndarray::Array1;

use crate::error::{Result, VoigtFitError};

/// Natural cubic spline through `(x, y)`.
///
/// Second derivatives vanish at both ends; the tridiagonal system for the
/// interior knots is solved with the Thomas algorithm.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn natural(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(VoigtFitError::DimensionMismatch(format!(
                "spline needs equal lengths, got {} and {}",
                n,
                y.len()
            )));
        }
        if n < 2 {
            return Err(VoigtFitError::InvalidInput(
                "spline needs at least two knots".to_string(),
            ));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(VoigtFitError::InvalidInput(
                "spline knots must be strictly increasing".to_string(),
            ));
        }

        let mut m = vec![0.0; n];
        if n > 2 {
            let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
            let interior = n - 2;

            // Forward sweep over rows 1..n-1.
            let mut c_prime = vec![0.0; interior];
            let mut d_prime = vec![0.0; interior];
            for row in 0..interior {
                let i = row + 1;
                let lower = h[i - 1];
                let diag = 2.0 * (h[i - 1] + h[i]);
                let upper = h[i];
                let rhs = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);

                let (c_prev, d_prev) = if row == 0 {
                    (0.0, 0.0)
                } else {
                    (c_prime[row - 1], d_prime[row - 1])
                };
                let denom = diag - lower * c_prev;
                c_prime[row] = upper / denom;
                d_prime[row] = (rhs - lower * d_prev) / denom;
            }

            // Back substitution; m[n-1] stays 0.
            for row in (0..interior).rev() {
                m[row + 1] = d_prime[row] - c_prime[row] * m[row + 2];
            }
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Value at `xq`, or `None` outside the knots.
    pub fn eval(&self, xq: f64) -> Option<f64> {
        if !(xq >= self.x_min() && xq <= self.x_max()) {
            return None;
        }
        let seg = self.x.partition_point(|&xi| xi <= xq).clamp(1, self.x.len() - 1) - 1;
        Some(self.eval_segment(seg, xq))
    }

    /// Values at ascending `xs`; points outside the knots get `outside`.
    pub fn eval_sorted(&self, xs: &[f64], outside: f64) -> Vec<f64> {
        let last_seg = self.x.len() - 2;
        let mut seg = 0;
        xs.iter()
            .map(|&xq| {
                if !(xq >= self.x_min() && xq <= self.x_max()) {
                    return outside;
                }
                while seg < last_seg && self.x[seg + 1] < xq {
                    seg += 1;
                }
                self.eval_segment(seg, xq)
            })
            .collect()
    }

    fn eval_segment(&self, i: usize, xq: f64) -> f64 {
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - xq) / h;
        let b = (xq - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }
}

/// Piecewise-linear interpolation of `(x, y)` at `x_new`, with `fill`
/// outside `[x[0], x[n-1]]`. `x` must be ascending.
pub fn interp_linear(x_new: &Array1<f64>, x: &[f64], y: &[f64], fill: f64) -> Array1<f64> {
    let n = x.len().min(y.len());
    if n == 0 {
        return Array1::from_elem(x_new.len(), fill);
    }

    x_new.mapv(|xq| {
        if !(xq >= x[0] && xq <= x[n - 1]) {
            return fill;
        }
        let hi = x[..n].partition_point(|&xi| xi < xq);
        if hi == 0 {
            return y[0];
        }
        let lo = hi - 1;
        let t = (xq - x[lo]) / (x[hi] - x[lo]);
        y[lo] + t * (y[hi] - y[lo])
    })
}
