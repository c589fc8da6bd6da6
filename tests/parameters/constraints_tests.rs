//! Expression ties as they are used between species.

use approx::assert_relative_eq;
use astrovoigt_rs::parameters::{Parameter, ParameterError, Parameters};
use astrovoigt_rs::VoigtFitError;

fn isotopologue_params() -> Parameters {
    let mut params = Parameters::new();
    params.add_param("v_rad_0", -11.0).unwrap();
    params.add_param_with_bounds("b_0_0", 2.0, 0.5, 5.5).unwrap();
    params.add_param_with_bounds("N_0_0", 1.4e13, 0.0, f64::INFINITY).unwrap();
    params.add_param_with_bounds("b_1_0", 2.0, 0.5, 5.5).unwrap();
    params.add_param_with_bounds("N_1_0", 1e11, 0.0, f64::INFINITY).unwrap();
    params
}

#[test]
fn test_tie_follows_reference_through_optimizer_updates() {
    let mut params = isotopologue_params();
    params.set_expr("N_1_0", Some("N_0_0 / 70")).unwrap();
    params.set_expr("b_1_0", Some("b_0_0")).unwrap();
    assert_eq!(params.nvarys(), 3);

    let mut internal = params.varying_internal_values().unwrap();
    // Move N_0_0 in the optimizer's space and map back.
    internal[2] *= 1.5;
    params.update_from_internal(&internal).unwrap();

    let n0 = params.get("N_0_0").unwrap().value();
    assert!(n0 > 1.4e13);
    assert_relative_eq!(params.get("N_1_0").unwrap().value(), n0 / 70.0, max_relative = 1e-14);
    assert_eq!(params.get("b_1_0").unwrap().value(), params.get("b_0_0").unwrap().value());
}

#[test]
fn test_chained_ties_evaluate_in_dependency_order() {
    let mut params = isotopologue_params();
    params.add(Parameter::new("v_rad_1", 0.0)).unwrap();
    params.add(Parameter::new("v_rad_2", 0.0)).unwrap();
    // v_rad_2 depends on v_rad_1, which is declared first but tied later.
    params.set_expr("v_rad_2", Some("v_rad_1 + 1.5")).unwrap();
    params.set_expr("v_rad_1", Some("v_rad_0 * 2")).unwrap();

    params.update_from_external(&[-10.0, 2.0, 1.4e13, 2.0, 1e11]).unwrap();
    assert_eq!(params.get("v_rad_1").unwrap().value(), -20.0);
    assert_eq!(params.get("v_rad_2").unwrap().value(), -18.5);
}

#[test]
fn test_circular_tie_is_rejected_and_rolled_back() {
    let mut params = isotopologue_params();
    params.set_expr("N_1_0", Some("N_0_0 / 70")).unwrap();

    let err = params.set_expr("N_0_0", Some("N_1_0 * 70")).unwrap_err();
    assert!(matches!(err, ParameterError::CircularDependency { .. }));
    assert!(params.get("N_0_0").unwrap().vary());
    assert_eq!(params.get("N_0_0").unwrap().expr(), None);

    // As a crate error it is a configuration problem.
    assert!(matches!(VoigtFitError::from(err), VoigtFitError::Configuration(_)));
}

#[test]
fn test_bad_expressions() {
    let mut params = isotopologue_params();
    assert!(params.set_expr("N_1_0", Some("N_0_0 /")).is_err());
    assert!(params.set_expr("N_1_0", Some("unknown_0 * 2")).is_err());
    assert!(params.set_expr("missing", Some("N_0_0")).is_err());

    // Functions are available to ties.
    params.set_expr("b_1_0", Some("max(b_0_0 / sqrt(13 / 12), 0.5)")).unwrap();
    assert_relative_eq!(
        params.get("b_1_0").unwrap().value(),
        2.0 / (13.0f64 / 12.0).sqrt(),
        epsilon = 1e-12
    );
}
