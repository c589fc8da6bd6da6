//! The CH+ λ4232 blend: two transitions, one cloud each.

use crate::test_helpers::{minimum, velocity_to_wavelength};
use astrovoigt_rs::config::{FitConfig, SynthesisConfig};
use astrovoigt_rs::constants::C_KMS;
use astrovoigt_rs::profile::voigt_fwhm;
use astrovoigt_rs::species::{Absorbers, SpeciesSpec};
use astrovoigt_rs::spectrum::{measure_fwhm, SpectrumSynthesizer};
use astrovoigt_rs::{AbsorptionModel, Model};
use ndarray::Array1;

fn blend() -> Vec<SpeciesSpec> {
    vec![
        SpeciesSpec::new("A")
            .with_transition(4232.548, 0.005, 1.0e8)
            .with_component(-11.0, 2.0, 1.4e11),
        SpeciesSpec::new("B")
            .with_transition(4232.300, 0.003, 1.0e8)
            .with_component(-11.0, 2.0, 1.4e11),
    ]
}

#[test]
fn test_blend_dip_position_and_width() {
    let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
    let lines = Absorbers::from_specs(&blend()).unwrap().lines();
    let synthesizer = SpectrumSynthesizer::new(SynthesisConfig::default().with_v_resolution(3.0));
    let flux = synthesizer.synthesize(&wavelength, &lines).unwrap();

    assert_eq!(flux.len(), 2000);
    let (i_min, f_min) = minimum(&flux);
    assert!(f_min < 1.0);

    // The stronger transition, shifted by -11 km/s
    let expected_center = 4232.548 * (1.0 - 11.0 / C_KMS);
    assert!(
        (wavelength[i_min] - expected_center).abs() < 0.02,
        "minimum at {} Å",
        wavelength[i_min]
    );
    assert!((wavelength[i_min] - 4232.4).abs() < 0.05);

    // Optically thin, so the dip has the line's own width. The profile's
    // Gaussian σ is b/√2, giving FWHM 2·sqrt(ln 2)·b; damping adds almost
    // nothing at γ = 1e8. Instrument and line add in quadrature.
    let gaussian = 2.0 * 2f64.ln().sqrt() * 2.0;
    let lorentzian = 1.0e8 / (2.0 * std::f64::consts::PI) * 4232.548e-13;
    let intrinsic = 0.5 * lorentzian + (lorentzian * lorentzian / 4.0 + gaussian * gaussian).sqrt();
    let expected = velocity_to_wavelength((intrinsic * intrinsic + 3.0 * 3.0).sqrt(), expected_center);
    let measured = measure_fwhm(&wavelength, &flux).unwrap();
    assert!(
        (measured - expected).abs() < 0.05 * expected,
        "FWHM {} Å, expected {} Å",
        measured,
        expected
    );

    // voigt_fwhm sizes the sampling grids and never underestimates the line.
    let sizing = voigt_fwhm(4232.548, 1.0e8, 2.0);
    assert!(sizing > intrinsic);
    let bound = velocity_to_wavelength((sizing * sizing + 3.0 * 3.0).sqrt(), expected_center);
    assert!(measured < bound, "FWHM {} Å exceeds {} Å", measured, bound);
}

#[test]
fn test_model_matches_synthesizer() {
    let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
    let config = FitConfig::default().with_synthesis(SynthesisConfig::default().with_v_resolution(3.0));
    let model = AbsorptionModel::from_specs(&blend(), &config).unwrap();

    let lines = Absorbers::from_specs(&blend()).unwrap().lines();
    let direct = SpectrumSynthesizer::new(config.synthesis)
        .synthesize(&wavelength, &lines)
        .unwrap();
    assert_eq!(model.eval(&wavelength).unwrap(), direct);
}

#[test]
fn test_instrument_resolution_broadens() {
    let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
    let lines = Absorbers::from_specs(&blend()).unwrap().lines();

    let width_at = |v_resolution: f64| {
        let synthesizer = SpectrumSynthesizer::new(SynthesisConfig::default().with_v_resolution(v_resolution));
        let flux = synthesizer.synthesize(&wavelength, &lines).unwrap();
        (measure_fwhm(&wavelength, &flux).unwrap(), minimum(&flux).1)
    };

    let (sharp_width, sharp_depth) = width_at(0.0);
    let (smooth_width, smooth_depth) = width_at(6.0);
    assert!(smooth_width > sharp_width);
    // Smoothing spreads the absorption, so the core gets shallower.
    assert!(smooth_depth > sharp_depth);
}
