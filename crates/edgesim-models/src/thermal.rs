//! Temperature model trait.

use dyn_clone::{clone_trait_object, DynClone};

/// A model for estimating the temperature of a processing unit based on its utilization.
pub trait TemperatureModel: DynClone {
    /// Returns temperature in Celsius degrees.
    ///
    /// Utilization should be passed as a float in 0.0-1.0 range.
    fn get_temperature(&self, utilization: f64) -> f64;
}

clone_trait_object!(TemperatureModel);
