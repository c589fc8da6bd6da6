//! Gaussian smoothing with the edge handling of `scipy.ndimage.gaussian_filter1d`.

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Convolve `input` with a normalized Gaussian of width `sigma` samples.
///
/// Edges use "reflect" mode (`d c b a | a b c d | d c b a`). A non-positive
/// `sigma` returns the input unchanged.
pub fn gaussian_filter1d(input: &[f64], sigma: f64) -> Vec<f64> {
    if !(sigma > 0.0) || input.is_empty() {
        return input.to_vec();
    }

    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let mut weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let k = i as f64 - radius as f64;
            (-0.5 * (k / sigma).powi(2)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);

    let n = input.len() as isize;
    (0..n)
        .map(|i| {
            weights
                .iter()
                .enumerate()
                .map(|(j, w)| w * input[reflect(i + j as isize - radius as isize, n)])
                .sum()
        })
        .collect()
}

fn reflect(i: isize, n: isize) -> usize {
    let period = 2 * n;
    let j = i.rem_euclid(period);
    (if j >= n { period - j - 1 } else { j }) as usize
}
