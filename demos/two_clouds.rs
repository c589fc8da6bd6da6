//! Recover two interstellar Ca I clouds from a noisy synthetic spectrum.
//!
//! Run with `cargo run --example two_clouds`.

use astrovoigt_rs::spectrum::{estimate_noise, uniform_weights};
use astrovoigt_rs::synthetic::noisy_spectrum;
use astrovoigt_rs::{AbsorptionModel, FitConfig, Model, ModelOrderSelector, SpeciesSpec};

use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn calcium() -> SpeciesSpec {
    SpeciesSpec::new("CaI").with_transition(4226.728, 1.77, 2.2e8)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Two-cloud Ca I selection");
    println!("========================\n");

    let truth = calcium()
        .with_component(-20.0, 2.0, 5e10)
        .with_component(15.0, 1.5, 3e10);
    let config = FitConfig::default();

    let wavelength = Array1::linspace(4225.9, 4227.5, 1600);
    let clean = AbsorptionModel::from_specs(&[truth], &config)?.eval(&wavelength)?;
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let flux = noisy_spectrum(&clean, 0.005, &mut rng)?;

    let sigma = estimate_noise(&flux, 100)?;
    println!("Estimated noise: {:.4}\n", sigma);
    let weights = uniform_weights(flux.len(), sigma)?;

    let outcome = ModelOrderSelector::new(config).select(&[calcium()], &wavelength, &flux, Some(&weights))?;

    println!("{:>3} {:>12} {:>10} {:>12} {:>12}  accepted", "k", "chisqr", "redchi", "AIC", "BIC");
    for step in &outcome.history {
        println!(
            "{:>3} {:>12.3} {:>10.4} {:>12.3} {:>12.3}  {}",
            step.components, step.chisqr, step.redchi, step.aic, step.bic, step.accepted
        );
    }

    println!("\nStopped: {}\n", outcome.termination);
    println!("{}", outcome.best);

    println!("Result as JSON:\n{}", outcome.best.to_json()?);
    Ok(())
}
