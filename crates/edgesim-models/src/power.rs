//! Power model trait.

use dyn_clone::{clone_trait_object, DynClone};

/// A model for estimating the power consumption of a processing unit based on its utilization.
pub trait PowerModel: DynClone {
    /// Returns power consumption in W.
    ///
    /// Utilization should be passed as a float in 0.0-1.0 range.
    fn get_power(&self, utilization: f64) -> f64;
}

clone_trait_object!(PowerModel);
