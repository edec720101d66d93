//! FullestPu mapping strategy.

use crate::core::mapping_strategy::{MappingStrategy, PuView};

/// FullestPu strategy, which returns the most occupied unit still able to accept the service.
pub struct FullestPu;

impl FullestPu {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for FullestPu {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStrategy for FullestPu {
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64> {
        if pu.additional_capacity(service_id) > 0 {
            Some(-pu.occupancy_ratio())
        } else {
            None
        }
    }
}
