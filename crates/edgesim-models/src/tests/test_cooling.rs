//! Tests for cooling power models.

use approx::assert_abs_diff_eq;

use crate::cooling::CoolingPowerModel;
use crate::cooling_models::constant::ConstantCoolingPowerModel;
use crate::cooling_models::cop::CopCoolingPowerModel;

#[test]
fn test_constant_model() {
    let model = ConstantCoolingPowerModel::new(50.);
    assert_eq!(model.get_power(0.), 0.);
    assert_eq!(model.get_power(100.), 50.);
    assert_eq!(model.get_power(500.), 50.);
}

#[test]
fn test_cop_model() {
    let model = CopCoolingPowerModel::new(4.);
    assert_abs_diff_eq!(model.get_power(0.), 0.);
    assert_abs_diff_eq!(model.get_power(100.), 25.);
    assert_abs_diff_eq!(model.get_power(220.), 55.);
}
