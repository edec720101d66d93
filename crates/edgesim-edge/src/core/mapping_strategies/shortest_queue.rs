//! ShortestQueue mapping strategy.

use crate::core::mapping_strategy::{MappingStrategy, PuView};

/// ShortestQueue strategy, which returns the eligible unit with the smallest queue-time estimate.
pub struct ShortestQueue;

impl ShortestQueue {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ShortestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStrategy for ShortestQueue {
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64> {
        if pu.additional_capacity(service_id) > 0 {
            Some(pu.queue_time(service_id))
        } else {
            None
        }
    }
}
