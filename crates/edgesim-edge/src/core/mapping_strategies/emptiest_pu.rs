//! EmptiestPu mapping strategy.

use crate::core::mapping_strategy::{MappingStrategy, PuView};

/// EmptiestPu strategy, which returns the least occupied unit able to accept the service.
pub struct EmptiestPu;

impl EmptiestPu {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for EmptiestPu {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStrategy for EmptiestPu {
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64> {
        if pu.additional_capacity(service_id) > 0 {
            Some(pu.occupancy_ratio())
        } else {
            None
        }
    }
}
