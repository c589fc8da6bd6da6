//! Fits at a fixed number of components on synthetic data.

use crate::test_helpers::calcium;
use astrovoigt_rs::config::FitConfig;
use astrovoigt_rs::spectrum::{estimate_noise, uniform_weights};
use astrovoigt_rs::synthetic::noisy_spectrum;
use astrovoigt_rs::{AbsorptionModel, Model, SpeciesSpec};
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const NOISE: f64 = 0.005;

fn observe(specs: &[SpeciesSpec], wavelength: &Array1<f64>, seed: u64) -> Array1<f64> {
    let truth = AbsorptionModel::from_specs(specs, &FitConfig::default()).unwrap();
    let flux = truth.eval(wavelength).unwrap();
    noisy_spectrum(&flux, NOISE, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap()
}

#[test]
fn test_single_component_recovered() {
    let wavelength = Array1::linspace(4225.9, 4227.5, 1600);
    let flux = observe(&[calcium().with_component(-5.0, 2.0, 5e10)], &wavelength, 1);

    let start = calcium().with_component(-3.0, 1.5, 3e10);
    let model = AbsorptionModel::from_specs(&[start], &FitConfig::default()).unwrap();
    let weights = uniform_weights(wavelength.len(), NOISE).unwrap();
    let result = model.fit(&wavelength, &flux, Some(&weights)).unwrap();

    assert!(result.success(), "{}", result);
    let component = result.species[0].components[0];
    assert!((component.v_rad + 5.0).abs() < 0.5, "v = {}", component.v_rad);
    assert!((component.b - 2.0).abs() < 0.7, "b = {}", component.b);
    assert!((component.n / 5e10 - 1.0).abs() < 0.2, "N = {:e}", component.n);

    // Weighted by the true noise, reduced chi-square is close to one.
    assert!((result.fit.redchi - 1.0).abs() < 0.2, "redchi = {}", result.fit.redchi);
    let n_err = component.n_err.unwrap();
    assert!(n_err > 0.0 && n_err < 0.2 * component.n);
    assert_eq!(result.fit.nvarys, 3);
}

#[test]
fn test_shared_velocity_and_tied_column() {
    let truth = [
        SpeciesSpec::new("12CH+")
            .with_transition(4232.548, 0.005, 1.0e8)
            .with_component(-11.0, 2.0, 3e13),
        SpeciesSpec::new("13CH+")
            .with_transition(4232.288, 0.005, 1.0e8)
            .with_component(-11.0, 2.0, 6e12),
    ];
    let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
    let flux = observe(&truth, &wavelength, 7);

    let start = [
        SpeciesSpec::new("12CH+")
            .with_transition(4232.548, 0.005, 1.0e8)
            .with_component(-9.5, 1.8, 2e13),
        SpeciesSpec::new("13CH+")
            .with_transition(4232.288, 0.005, 1.0e8)
            .with_component(-9.5, 1.8, 4e12),
    ];
    let mut model = AbsorptionModel::from_specs(&start, &FitConfig::default()).unwrap();
    model.tie("N_1_0", "N_0_0 / 5").unwrap();
    model.tie("b_1_0", "b_0_0").unwrap();

    let sigma = estimate_noise(&flux, 50).unwrap();
    let weights = uniform_weights(wavelength.len(), sigma).unwrap();
    let result = model.fit(&wavelength, &flux, Some(&weights)).unwrap();
    assert!(result.success(), "{}", result);

    let main = result.species[0].components[0];
    let rare = result.species[1].components[0];
    assert_eq!(main.v_rad, rare.v_rad);
    assert_eq!(main.v_rad_err, rare.v_rad_err);
    assert!((main.v_rad + 11.0).abs() < 0.5, "v = {}", main.v_rad);
    assert!((rare.n * 5.0 / main.n - 1.0).abs() < 1e-12);
    assert_eq!(rare.n_err, None);
    assert_eq!(result.fit.nvarys, 3);

    let json = result.to_json().unwrap();
    assert!(json.contains("13CH+"));
}

#[test]
fn test_mismatched_weights_rejected() {
    let wavelength = Array1::linspace(4225.9, 4227.5, 100);
    let flux = Array1::ones(100);
    let model = AbsorptionModel::from_specs(&[calcium().with_component(0.0, 2.0, 1e10)], &FitConfig::default()).unwrap();

    let weights = Array1::ones(99);
    assert!(model.fit(&wavelength, &flux, Some(&weights)).is_err());
}
