//! Levenberg-Marquardt on problems with known solutions.

use approx::assert_relative_eq;
use astrovoigt_rs::lm::{ConvergenceStatus, DecompositionMethod, LevenbergMarquardt, LmConfig};
use astrovoigt_rs::{Problem, Result};
use ndarray::{Array1, Array2};

/// y = a · exp(-x / tau) + c
struct Decay {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl Decay {
    fn new(a: f64, tau: f64, c: f64) -> Self {
        let x = Array1::linspace(0.0, 10.0, 50);
        let y = x.mapv(|x| a * (-x / tau).exp() + c);
        Self { x, y }
    }
}

impl Problem for Decay {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, tau, c) = (params[0], params[1], params[2]);
        Ok(&self.y - &self.x.mapv(|x| a * (-x / tau).exp() + c))
    }

    fn parameter_count(&self) -> usize {
        3
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }
}

/// The same problem with an analytic Jacobian.
struct AnalyticDecay(Decay);

impl Problem for AnalyticDecay {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.0.eval(params)
    }

    fn parameter_count(&self) -> usize {
        3
    }

    fn residual_count(&self) -> usize {
        self.0.x.len()
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        let (a, tau) = (params[0], params[1]);
        let mut jac = Array2::zeros((self.0.x.len(), 3));
        for (i, &x) in self.0.x.iter().enumerate() {
            let e = (-x / tau).exp();
            jac[[i, 0]] = -e;
            jac[[i, 1]] = -a * e * x / (tau * tau);
            jac[[i, 2]] = -1.0;
        }
        Ok(jac)
    }
}

#[test]
fn test_decay_recovered_with_every_decomposition() {
    for method in [DecompositionMethod::Auto, DecompositionMethod::Cholesky, DecompositionMethod::Svd] {
        let problem = Decay::new(2.5, 1.7, 0.3);
        let lm = LevenbergMarquardt::with_config(LmConfig::default().with_decomposition(method));
        let result = lm.minimize(&problem, Array1::from_vec(vec![1.0, 1.0, 0.0])).unwrap();

        assert!(result.success, "{:?}: {}", method, result);
        assert_relative_eq!(result.params[0], 2.5, epsilon = 1e-5);
        assert_relative_eq!(result.params[1], 1.7, epsilon = 1e-5);
        assert_relative_eq!(result.params[2], 0.3, epsilon = 1e-5);
    }
}

#[test]
fn test_analytic_jacobian_saves_evaluations() {
    let start = Array1::from_vec(vec![1.0, 1.0, 0.0]);
    let lm = LevenbergMarquardt::new();

    let numeric = lm.minimize(&Decay::new(2.5, 1.7, 0.3), start.clone()).unwrap();
    let analytic = lm.minimize(&AnalyticDecay(Decay::new(2.5, 1.7, 0.3)), start).unwrap();

    assert!(analytic.success);
    assert_relative_eq!(analytic.params[1], numeric.params[1], epsilon = 1e-5);
    assert!(analytic.func_evals < numeric.func_evals);
}

#[test]
fn test_exact_start_stops_immediately() {
    let problem = Decay::new(2.5, 1.7, 0.3);
    let result = LevenbergMarquardt::new()
        .minimize(&problem, Array1::from_vec(vec![2.5, 1.7, 0.3]))
        .unwrap();

    assert_eq!(result.status, ConvergenceStatus::ExactFit);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.cost, 0.0);
}
