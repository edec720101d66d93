//! Cooling power model trait.

use dyn_clone::{clone_trait_object, DynClone};

/// A model for estimating the power spent on cooling IT equipment.
pub trait CoolingPowerModel: DynClone {
    /// Returns cooling power consumption in W for the given IT power draw in W.
    fn get_power(&self, it_power: f64) -> f64;
}

clone_trait_object!(CoolingPowerModel);
