//! From per-species input to the flat line list.

use astrovoigt_rs::config::ComponentDefaults;
use astrovoigt_rs::expander::{column_name, doppler_name, velocity_name, ParameterExpander};
use astrovoigt_rs::species::{Absorbers, SpeciesSpec};
use astrovoigt_rs::VoigtFitError;

fn sodium_and_potassium() -> Vec<SpeciesSpec> {
    vec![
        SpeciesSpec::new("NaI")
            .with_transition(5889.951, 0.641, 6.16e7)
            .with_transition(5895.924, 0.320, 6.14e7)
            .with_component(-11.0, 2.0, 1e11)
            .with_component(4.0, 1.0, 5e10),
        SpeciesSpec::new("KI")
            .with_transition(7698.965, 0.332, 3.8e7)
            .with_component(-11.0, 1.5, 2e10)
            .with_component(4.0, 0.8, 1e10),
    ]
}

#[test]
fn test_every_component_absorbs_in_every_transition() {
    let absorbers = Absorbers::from_specs(&sodium_and_potassium()).unwrap();
    let expander = ParameterExpander::new(absorbers, &ComponentDefaults::default()).unwrap();
    let lines = expander.expand(&expander.parameters().unwrap()).unwrap();

    // 2 × 2 for sodium, 1 × 2 for potassium
    assert_eq!(lines.len(), 6);
    let sodium: Vec<_> = lines.iter().filter(|l| l.transition.lambda0 < 6000.0).collect();
    assert_eq!(sodium.len(), 4);
    for line in &sodium {
        let expected_b = if line.cloud.v_rad == -11.0 { 2.0 } else { 1.0 };
        assert_eq!(line.cloud.b, expected_b);
    }
}

#[test]
fn test_shared_velocities_have_one_parameter() {
    let absorbers = Absorbers::from_specs(&sodium_and_potassium()).unwrap();
    let expander = ParameterExpander::new(absorbers, &ComponentDefaults::default()).unwrap();
    let mut params = expander.parameters().unwrap();

    // Two groups, each with one velocity for both species.
    assert_eq!(expander.absorbers().groups.len(), 2);
    assert_eq!(params.len(), 2 + 2 * 4);
    assert!(params.contains(&velocity_name(1)));
    assert!(params.contains(&doppler_name(1, 1)));
    assert!(params.contains(&column_name(0, 1)));

    params.get_mut(&velocity_name(0)).unwrap().set_value(-12.5).unwrap();
    let lines = expander.expand(&params).unwrap();
    let shifted: Vec<f64> = lines
        .iter()
        .filter(|l| l.cloud.b == 2.0 || l.cloud.b == 1.5)
        .map(|l| l.cloud.v_rad)
        .collect();
    assert_eq!(shifted, vec![-12.5, -12.5, -12.5]);
}

#[test]
fn test_missing_fields_are_configuration_errors() {
    let mut missing_f = sodium_and_potassium();
    missing_f[0].f.pop();
    assert!(matches!(Absorbers::from_specs(&missing_f), Err(VoigtFitError::Configuration(_))));

    let mut missing_n = sodium_and_potassium();
    missing_n[1].n.pop();
    assert!(matches!(Absorbers::from_specs(&missing_n), Err(VoigtFitError::Configuration(_))));

    let json = r#"{ "name": "NaI", "lambda": [5889.951], "f": [0.641] }"#;
    assert!(serde_json::from_str::<SpeciesSpec>(json).is_err());
}

#[test]
fn test_species_from_json() {
    let json = r#"[
        { "name": "12CH+", "lambda": [4232.548], "f": [0.005], "gamma": [1e8],
          "b": [2.0], "N": [1.4e13], "v_rad": [-11.0] },
        { "name": "13CH+", "lambda": [4232.288], "f": [0.005], "gamma": [1e8],
          "b": [2.0], "N": [2e11], "v_rad": [-11.0] }
    ]"#;
    let specs: Vec<SpeciesSpec> = serde_json::from_str(json).unwrap();
    let absorbers = Absorbers::from_specs(&specs).unwrap();

    assert_eq!(absorbers.groups.len(), 1);
    assert_eq!(absorbers.groups[0].members, vec![(0, 0), (1, 0)]);
    assert_eq!(absorbers.to_specs(), specs);
}
