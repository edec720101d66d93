//! Disposable digital twins of processing units.

use std::collections::HashMap;

use indexmap::IndexMap;

use edgesim_models::power::PowerModel;

use crate::core::config::PuServiceConfig;
use crate::core::mapping_strategy::PuView;

/// A lightweight mirror of a processing unit used by planning components.
///
/// The twin starts from an empty state and tracks only virtual occupancy, so the resource
/// slicer can rank and reserve capacity without mutating the real unit.
#[derive(Clone)]
pub struct PuTwin {
    pu_id: String,
    services: IndexMap<String, PuServiceConfig>,
    power_model: Box<dyn PowerModel>,
    occupied: HashMap<String, u32>,
    bound_service: Option<String>,
}

impl PuTwin {
    pub fn new(pu_id: &str, services: IndexMap<String, PuServiceConfig>, power_model: Box<dyn PowerModel>) -> Self {
        Self {
            pu_id: pu_id.to_string(),
            services,
            power_model,
            occupied: HashMap::new(),
            bound_service: None,
        }
    }

    /// Virtually occupies `count` capacity units of the service, binding the twin to it.
    pub fn occupy(&mut self, service_id: &str, count: u32) {
        assert!(
            self.additional_capacity(service_id) >= count,
            "Twin of `{}` cannot virtually host {} more units of `{}`",
            self.pu_id,
            count,
            service_id
        );
        *self.occupied.entry(service_id.to_string()).or_insert(0) += count;
        self.bound_service = Some(service_id.to_string());
    }

    fn utilization(&self) -> f64 {
        self.occupied
            .iter()
            .map(|(service, count)| self.services[service].share() * *count as f64 / 100.)
            .sum()
    }
}

impl PuView for PuTwin {
    fn pu_id(&self) -> &str {
        &self.pu_id
    }

    fn additional_capacity(&self, service_id: &str) -> u32 {
        if let Some(bound) = &self.bound_service {
            if bound != service_id {
                return 0;
            }
        }
        let max = self.max_capacity(service_id);
        let used = self.occupied.get(service_id).copied().unwrap_or(0);
        max.saturating_sub(used)
    }

    fn max_capacity(&self, service_id: &str) -> u32 {
        self.services.get(service_id).map_or(0, |cfg| cfg.max_concurrent)
    }

    fn occupancy_ratio(&self) -> f64 {
        match &self.bound_service {
            Some(service) => {
                let max = self.max_capacity(service);
                if max == 0 {
                    0.
                } else {
                    self.occupied.get(service).copied().unwrap_or(0) as f64 / max as f64
                }
            }
            None => 0.,
        }
    }

    fn queue_time(&self, _service_id: &str) -> f64 {
        0.
    }

    fn power_increment(&self, service_id: &str) -> f64 {
        let share = match self.services.get(service_id) {
            Some(cfg) => cfg.share() / 100.,
            None => return f64::INFINITY,
        };
        let utilization = self.utilization();
        self.power_model.get_power((utilization + share).min(1.)) - self.power_model.get_power(utilization)
    }
}
