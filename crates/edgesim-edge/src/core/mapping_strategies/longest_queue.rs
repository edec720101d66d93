//! LongestQueue mapping strategy.

use crate::core::mapping_strategy::{MappingStrategy, PuView};

/// LongestQueue strategy, which returns the eligible unit with the largest queue-time estimate.
pub struct LongestQueue;

impl LongestQueue {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LongestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStrategy for LongestQueue {
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64> {
        if pu.additional_capacity(service_id) > 0 {
            Some(-pu.queue_time(service_id))
        } else {
            None
        }
    }
}
