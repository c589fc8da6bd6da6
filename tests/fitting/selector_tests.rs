//! Model-order selection on synthetic Ca I spectra.

use crate::test_helpers::calcium;
use astrovoigt_rs::config::{FitConfig, SelectorConfig};
use astrovoigt_rs::lm::LmConfig;
use astrovoigt_rs::spectrum::uniform_weights;
use astrovoigt_rs::synthetic::noisy_spectrum;
use astrovoigt_rs::{AbsorptionModel, Model, ModelOrderSelector, Termination};
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const NOISE: f64 = 0.005;

/// Two well separated clouds at -20 and +15 km/s.
fn two_clouds() -> (Array1<f64>, Array1<f64>) {
    let truth = calcium()
        .with_component(-20.0, 2.0, 5e10)
        .with_component(15.0, 1.5, 3e10);
    let wavelength = Array1::linspace(4225.9, 4227.5, 1600);
    let model = AbsorptionModel::from_specs(&[truth], &FitConfig::default()).unwrap();
    let flux = model.eval(&wavelength).unwrap();
    let noisy = noisy_spectrum(&flux, NOISE, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
    (wavelength, noisy)
}

#[test]
fn test_two_clouds_are_found() {
    let (wavelength, flux) = two_clouds();
    let weights = uniform_weights(wavelength.len(), NOISE).unwrap();

    let outcome = ModelOrderSelector::default()
        .select(&[calcium()], &wavelength, &flux, Some(&weights))
        .unwrap();

    assert_eq!(outcome.component_count(), 2, "{}", outcome.best);
    assert!(
        matches!(outcome.termination, Termination::CriteriaSatisfied | Termination::Degenerate(_)),
        "{}",
        outcome.termination
    );

    let mut components = outcome.best.species[0].components.clone();
    components.sort_by(|a, b| a.v_rad.total_cmp(&b.v_rad));
    for (fitted, (v, n)) in components.iter().zip([(-20.0, 5e10), (15.0, 3e10)]) {
        assert!((fitted.v_rad - v).abs() < 1.0, "v = {} expected {}", fitted.v_rad, v);
        assert!(fitted.n > n / 2.0 && fitted.n < n * 2.0, "N = {:e} expected {:e}", fitted.n, n);
    }

    // One seeded fit, then the accepted second component.
    assert_eq!(outcome.history[0].components, 1);
    assert!(outcome.history[0].accepted);
    assert_eq!(outcome.history[0].delta_bic, None);
    assert_eq!(outcome.history[1].components, 2);
    assert!(outcome.history[1].accepted);
    assert!(outcome.history[1].delta_bic.unwrap() < 0.0);
    assert!(outcome.history.iter().skip(2).all(|step| !step.accepted));

    // The run ends on a rejected third component.
    let last = outcome.history.last().unwrap();
    assert_eq!(outcome.history.len(), 3);
    assert_eq!(last.components, 3);
    assert!(last.success && !last.accepted);
}

#[test]
fn test_close_components_are_degenerate() {
    let (wavelength, flux) = two_clouds();
    let config = FitConfig::default().with_selector(SelectorConfig::default().with_min_separation(100.0));

    let outcome = ModelOrderSelector::new(config)
        .select(&[calcium()], &wavelength, &flux, None)
        .unwrap();

    match &outcome.termination {
        Termination::Degenerate(reason) => assert!(reason.contains("closer than"), "{}", reason),
        other => panic!("expected a degenerate proposal, got {}", other),
    }
    assert_eq!(outcome.component_count(), 1);
    assert_eq!(outcome.history.len(), 2);
    assert!(outcome.history[1].success && !outcome.history[1].accepted);
}

#[test]
fn test_insignificant_column_is_degenerate() {
    let (wavelength, flux) = two_clouds();
    let weights = uniform_weights(wavelength.len(), NOISE).unwrap();
    let config = FitConfig::default().with_selector(SelectorConfig::default().with_min_significance(1e6));

    let outcome = ModelOrderSelector::new(config)
        .select(&[calcium()], &wavelength, &flux, Some(&weights))
        .unwrap();

    assert!(matches!(outcome.termination, Termination::Degenerate(_)), "{}", outcome.termination);
    assert_eq!(outcome.component_count(), 1);
    assert!(!outcome.history.last().unwrap().accepted);
}

#[test]
fn test_failed_proposal_keeps_previous_fit() {
    let (wavelength, flux) = two_clouds();
    // The first cloud is pinned, so the starting model has nothing to optimize
    // and only the proposal runs into the iteration limit.
    let start = calcium().with_component(-20.0, 2.0, 5e10);
    let config = FitConfig::default().with_optimizer(LmConfig::default().with_max_iterations(1));

    let outcome = ModelOrderSelector::new(config)
        .with_tie("v_rad_0", "-20")
        .with_tie("b_0_0", "2")
        .with_tie("N_0_0", "5e10")
        .select(&[start], &wavelength, &flux, None)
        .unwrap();

    assert!(matches!(outcome.termination, Termination::NonConvergence(_)), "{}", outcome.termination);
    assert_eq!(outcome.component_count(), 1);
    assert!(outcome.best.success());
    assert_eq!(outcome.best.fit.nvarys, 0);
    assert!((outcome.best.species[0].components[0].v_rad + 20.0).abs() < 1e-12);

    assert_eq!(outcome.history.len(), 2);
    assert!(outcome.history[0].accepted);
    assert_eq!(outcome.history[1].components, 2);
    assert!(!outcome.history[1].success && !outcome.history[1].accepted);
}

#[test]
fn test_component_limit() {
    let (wavelength, flux) = two_clouds();
    let config = FitConfig::default().with_selector(SelectorConfig::default().with_max_components(1));

    let outcome = ModelOrderSelector::new(config)
        .select(&[calcium()], &wavelength, &flux, None)
        .unwrap();

    assert_eq!(outcome.termination, Termination::ComponentLimit);
    assert_eq!(outcome.component_count(), 1);
    assert_eq!(outcome.history.len(), 1);
}

#[test]
fn test_ties_apply_to_every_model() {
    let (wavelength, flux) = two_clouds();
    let start = calcium()
        .with_component(-19.0, 1.0, 4e10)
        .with_component(14.0, 1.0, 4e10);
    let config = FitConfig::default().with_selector(SelectorConfig::default().with_max_components(2));

    let outcome = ModelOrderSelector::new(config)
        .with_tie("b_0_1", "b_0_0")
        .select(&[start], &wavelength, &flux, None)
        .unwrap();

    let components = &outcome.best.species[0].components;
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].b, components[1].b);
    assert_eq!(components[1].b_err, None);
    assert_eq!(outcome.best.fit.nvarys, 5);
}

#[test]
fn test_uneven_starting_components_rejected() {
    let (wavelength, flux) = two_clouds();
    let other = astrovoigt_rs::SpeciesSpec::new("CaII").with_transition(3933.663, 0.627, 1.47e8);
    let ca = calcium().with_component(-20.0, 2.0, 5e10);

    let result = ModelOrderSelector::default().select(&[ca, other], &wavelength, &flux, None);
    assert!(result.is_err());
}
