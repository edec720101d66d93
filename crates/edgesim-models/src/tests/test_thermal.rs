//! Tests for temperature models.

use approx::assert_abs_diff_eq;

use crate::thermal::TemperatureModel;
use crate::thermal_models::constant::ConstantTemperatureModel;
use crate::thermal_models::linear::LinearTemperatureModel;

#[test]
fn test_constant_model() {
    let model = ConstantTemperatureModel::new(25.);
    assert_eq!(model.get_temperature(0.), 25.);
    assert_eq!(model.get_temperature(1.), 25.);
}

#[test]
fn test_linear_model() {
    let model = LinearTemperatureModel::new(30., 70.);
    assert_abs_diff_eq!(model.get_temperature(0.), 30.);
    assert_abs_diff_eq!(model.get_temperature(0.5), 50.);
    assert_abs_diff_eq!(model.get_temperature(1.), 70.);
}
