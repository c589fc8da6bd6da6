//! Properties of synthesized transmission spectra.

use astrovoigt_rs::config::SynthesisConfig;
use astrovoigt_rs::species::{Cloud, Line, LineList, Transition};
use astrovoigt_rs::spectrum::{measure_fwhm, SpectrumSynthesizer};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn one_line(lambda0: f64, cloud: Cloud) -> LineList {
    [Line {
        transition: Transition::new(lambda0, 0.005, 1.0e8),
        cloud,
    }]
    .into_iter()
    .collect()
}

#[test]
fn test_zero_column_density_is_flat() {
    let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
    let lines = one_line(4232.548, Cloud::new(-11.0, 2.0, 0.0));

    for v_resolution in [0.0, 3.0, 8.0] {
        let synthesizer = SpectrumSynthesizer::new(SynthesisConfig::default().with_v_resolution(v_resolution));
        let flux = synthesizer.synthesize(&wavelength, &lines).unwrap();
        assert!(flux.iter().all(|&f| f == 1.0), "absorption at v_resolution = {}", v_resolution);
    }
}

#[test]
fn test_transmission_stays_in_unit_interval() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let wavelength = Array1::linspace(4225.0, 4228.0, 3000);

    for _ in 0..10 {
        let lines: LineList = (0..rng.gen_range(1..6))
            .map(|_| Line {
                transition: Transition::new(
                    rng.gen_range(4225.5..4227.5),
                    rng.gen_range(0.01..0.5),
                    rng.gen_range(1e7..1e9),
                ),
                cloud: Cloud::new(
                    rng.gen_range(-30.0..30.0),
                    rng.gen_range(1.0..5.0),
                    rng.gen_range(0.0..1e12),
                ),
            })
            .collect();
        let v_resolution = if rng.gen_bool(0.2) { 0.0 } else { rng.gen_range(1.0..6.0) };

        let synthesizer = SpectrumSynthesizer::new(SynthesisConfig::default().with_v_resolution(v_resolution));
        let flux = synthesizer.synthesize(&wavelength, &lines).unwrap();

        assert_eq!(flux.len(), wavelength.len());
        assert!(
            flux.iter().all(|&f| f > 0.0 && f <= 1.0),
            "transmission outside (0, 1] for {:?}",
            lines
        );
    }
}

#[test]
fn test_synthesis_is_repeatable() {
    let wavelength = Array1::linspace(4231.5, 4233.5, 2000);
    let lines = one_line(4232.548, Cloud::new(-11.0, 2.0, 1.4e13));
    let synthesizer = SpectrumSynthesizer::default();

    let first = synthesizer.synthesize(&wavelength, &lines).unwrap();
    let second = synthesizer.synthesize(&wavelength, &lines).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_line_at_rest_is_symmetric() {
    let lambda0 = 4232.548;
    let wavelength: Array1<f64> = (0..=2000).map(|i| lambda0 + (i as f64 - 1000.0) * 0.001).collect();
    let lines = one_line(lambda0, Cloud::new(0.0, 2.0, 2e13));

    let flux = SpectrumSynthesizer::default().synthesize(&wavelength, &lines).unwrap();
    assert!(flux[1000] < 0.9);
    for i in 1..1000 {
        let (blue, red) = (flux[1000 - i], flux[1000 + i]);
        assert!((blue - red).abs() < 1e-3, "asymmetry {} at offset {}", blue - red, i);
    }
}

#[test]
fn test_broadening_never_narrows_the_line() {
    let wavelength = Array1::linspace(4231.5, 4233.5, 4000);
    let synthesizer = SpectrumSynthesizer::default();

    let widths: Vec<f64> = [0.6, 1.0, 2.0, 3.0, 4.5]
        .iter()
        .map(|&b| {
            let flux = synthesizer
                .synthesize(&wavelength, &one_line(4232.548, Cloud::new(-11.0, b, 2e12)))
                .unwrap();
            measure_fwhm(&wavelength, &flux).unwrap()
        })
        .collect();

    for pair in widths.windows(2) {
        assert!(pair[1] >= pair[0], "FWHM decreased: {:?}", widths);
    }
}

#[test]
fn test_far_samples_are_unabsorbed() {
    let wavelength = Array1::linspace(4200.0, 4260.0, 6000);
    let lines = one_line(4232.548, Cloud::new(-11.0, 2.0, 1e14));
    let flux = SpectrumSynthesizer::default().synthesize(&wavelength, &lines).unwrap();

    assert_eq!(flux[0], 1.0);
    assert_eq!(flux[5999], 1.0);
    // 1 Å is more than 60 km/s from the line.
    let far_from_line = wavelength
        .iter()
        .zip(flux.iter())
        .filter(|(&l, _)| (l - 4232.39).abs() > 1.0);
    assert!(far_from_line.into_iter().all(|(_, &f)| f == 1.0));
}
