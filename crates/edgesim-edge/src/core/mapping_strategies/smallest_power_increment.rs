//! SmallestPowerIncrement mapping strategy.

use crate::core::mapping_strategy::{MappingStrategy, PuView};

/// SmallestPowerIncrement strategy, which returns the eligible unit whose power draw grows the
/// least by accepting the work.
pub struct SmallestPowerIncrement;

impl SmallestPowerIncrement {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for SmallestPowerIncrement {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStrategy for SmallestPowerIncrement {
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64> {
        if pu.additional_capacity(service_id) > 0 {
            Some(pu.power_increment(service_id))
        } else {
            None
        }
    }
}
