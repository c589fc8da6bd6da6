//! Parameter sets between the optimizer, results and JSON.

use approx::assert_relative_eq;
use astrovoigt_rs::parameters::Parameters;

#[test]
fn test_internal_round_trip_respects_bounds() {
    let mut params = Parameters::new();
    params.add_param("v_rad_0", -11.0).unwrap();
    params.add_param_with_bounds("b_0_0", 5.4, 0.5, 5.5).unwrap();
    params.add_param_with_bounds("N_0_0", 3e10, 0.0, f64::INFINITY).unwrap();

    let internal = params.varying_internal_values().unwrap();
    params.update_from_internal(&internal).unwrap();
    assert_relative_eq!(params.get("v_rad_0").unwrap().value(), -11.0, epsilon = 1e-12);
    assert_relative_eq!(params.get("b_0_0").unwrap().value(), 5.4, max_relative = 1e-9);
    assert_relative_eq!(params.get("N_0_0").unwrap().value(), 3e10, max_relative = 1e-9);

    // Any internal value maps inside the bounds.
    params.update_from_internal(&[0.0, 1e6, -1e6]).unwrap();
    let b = params.get("b_0_0").unwrap().value();
    assert!((0.5..=5.5).contains(&b));
    assert!(params.get("N_0_0").unwrap().value() >= 0.0);
}

#[test]
fn test_wrong_number_of_values() {
    let mut params = Parameters::new();
    params.add_param("v_rad_0", -11.0).unwrap();
    assert!(params.update_from_external(&[1.0, 2.0]).is_err());
    assert!(params.set_varying_stderrs(&[]).is_err());
}

#[test]
fn test_json_keeps_order_ties_and_errors() {
    let mut params = Parameters::new();
    params.add_param("v_rad_0", -11.0).unwrap();
    params.add_param_with_bounds("N_0_0", 1.4e13, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_expr("N_1_0", 0.0, "N_0_0 / 70").unwrap();
    params.update_expressions().unwrap();
    params.set_varying_stderrs(&[Some(0.3), Some(2e11)]).unwrap();

    let json = params.to_json().unwrap();
    let mut restored = Parameters::from_json(&json).unwrap();

    assert_eq!(restored.names(), vec!["v_rad_0", "N_0_0", "N_1_0"]);
    assert_eq!(restored.get("N_0_0").unwrap().stderr(), Some(2e11));
    assert_eq!(restored.get("N_1_0").unwrap().expr(), Some("N_0_0 / 70"));

    // The tie is live again after loading.
    restored.update_from_external(&[-11.0, 7e12]).unwrap();
    assert_relative_eq!(restored.get("N_1_0").unwrap().value(), 1e11, max_relative = 1e-14);
}

#[test]
fn test_save_and_load_file() {
    let mut params = Parameters::new();
    params.add_param_with_bounds("b_0_0", 2.0, 0.5, 5.5).unwrap();

    let path = std::env::temp_dir().join(format!("astrovoigt-params-{}.json", std::process::id()));
    params.save_json(&path).unwrap();
    let loaded = Parameters::load_json(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.get("b_0_0").unwrap().max(), 5.5);
}
