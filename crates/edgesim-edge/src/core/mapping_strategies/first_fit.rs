//! FirstFit mapping strategy.

use crate::core::mapping_strategy::{MappingStrategy, PuView};

/// FirstFit strategy, which returns the first unit able to accept the service.
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for FirstFit {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStrategy for FirstFit {
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64> {
        if pu.additional_capacity(service_id) > 0 {
            Some(0.)
        } else {
            None
        }
    }
}
