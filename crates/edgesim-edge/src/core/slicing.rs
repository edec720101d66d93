//! Dynamic partitioning of the processing unit pool into per-service capacity reservations.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::core::mapping_strategy::{MappingStrategy, PuView};
use crate::core::pu_twin::PuTwin;

/// Capacity reservation dedicating a subset of processing units to one service.
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    /// Expected demand the slice was sized for.
    pub target: u32,
    /// Total empty-state capacity of the reserved units; may fall short of the target when the
    /// pool is exhausted.
    pub capacity: u32,
    pub pus: BTreeSet<String>,
}

impl Slice {
    /// Set when the reserved capacity does not cover the demand target.
    pub fn congested(&self) -> bool {
        self.capacity < self.target
    }
}

/// Partitioning of an EDC pool: one slice per service plus the residual unassigned pool.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Slicing {
    pub slices: IndexMap<String, Slice>,
    pub unassigned: BTreeSet<String>,
}

impl Slicing {
    /// Returns the service a processing unit is reserved for, `None` for the unassigned pool.
    pub fn service_of(&self, pu_id: &str) -> Option<&str> {
        self.slices
            .iter()
            .find(|(_, slice)| slice.pus.contains(pu_id))
            .map(|(service, _)| service.as_str())
    }
}

/// Sizes per-service capacity reservations over disposable twins of the pool.
pub struct ResourceSlicer;

impl ResourceSlicer {
    /// Partitions the pool to meet the expected per-service demand.
    ///
    /// Services are visited in the priority (iteration) order of `expected`. Each service with a
    /// positive target greedily draws whole units from the still-free pool, best candidates
    /// first as ranked by the mapping strategy, until the cumulative empty-state capacity of the
    /// drawn units meets the target or the pool runs out. Remaining units form the unassigned
    /// pool. The result is deterministic for a fixed pool and strategy; real units are never
    /// mutated.
    pub fn slice(expected: &IndexMap<String, u32>, pool: Vec<PuTwin>, mapping: &dyn MappingStrategy) -> Slicing {
        let mut free = pool;
        let mut slices = IndexMap::new();
        for (service, &target) in expected {
            let mut slice = Slice {
                target,
                capacity: 0,
                pus: BTreeSet::new(),
            };
            while target > 0 && slice.capacity < target {
                let views: Vec<&dyn PuView> = free.iter().map(|twin| twin as &dyn PuView).collect();
                let queue = mapping.map_priority_queue(service, &views);
                match queue.first() {
                    Some(&best) => {
                        let twin = free.remove(best);
                        slice.capacity += twin.max_capacity(service);
                        slice.pus.insert(twin.pu_id().to_string());
                    }
                    None => break,
                }
            }
            slices.insert(service.clone(), slice);
        }
        let unassigned = free.iter().map(|twin| twin.pu_id().to_string()).collect();
        Slicing { slices, unassigned }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::indexmap;

    use edgesim_models::power_models::constant::ConstantPowerModel;

    use super::*;
    use crate::core::config::PuServiceConfig;
    use crate::core::mapping_strategies::emptiest_pu::EmptiestPu;

    fn twin(pu_id: &str, sess_cap: u32, req_cap: u32) -> PuTwin {
        let mut services = IndexMap::new();
        if sess_cap > 0 {
            services.insert(
                "sess".to_string(),
                PuServiceConfig {
                    max_concurrent: sess_cap,
                    t_open: 0.,
                    t_close: 0.,
                },
            );
        }
        if req_cap > 0 {
            services.insert(
                "req".to_string(),
                PuServiceConfig {
                    max_concurrent: req_cap,
                    t_open: 0.,
                    t_close: 0.,
                },
            );
        }
        PuTwin::new(pu_id, services, Box::new(ConstantPowerModel::new(100.)))
    }

    fn pool() -> Vec<PuTwin> {
        vec![
            twin("pu_1_0", 2, 1),
            twin("pu_1_1", 2, 1),
            twin("pu_1_2", 2, 1),
            twin("pu_1_3", 2, 1),
            twin("pu_1_4", 3, 1),
        ]
    }

    #[test]
    fn slices_follow_priority_order() {
        let expected = indexmap! {"sess".to_string() => 1, "req".to_string() => 2};
        let slicing = ResourceSlicer::slice(&expected, pool(), &EmptiestPu::new());

        let sess = &slicing.slices["sess"];
        assert_eq!(sess.capacity, 2);
        assert!(sess.pus.contains("pu_1_0"));
        let req = &slicing.slices["req"];
        assert_eq!(req.capacity, 2);
        assert!(req.pus.contains("pu_1_1") && req.pus.contains("pu_1_2"));
        assert_eq!(slicing.unassigned.len(), 2);
    }

    #[test]
    fn slicing_is_deterministic() {
        let expected = indexmap! {"sess".to_string() => 3, "req".to_string() => 1};
        let first = ResourceSlicer::slice(&expected, pool(), &EmptiestPu::new());
        let second = ResourceSlicer::slice(&expected, pool(), &EmptiestPu::new());
        assert_eq!(first, second);
    }

    #[test]
    fn zero_demand_releases_everything_to_unassigned() {
        let expected = indexmap! {"sess".to_string() => 1, "req".to_string() => 1};
        let slicing = ResourceSlicer::slice(&expected, pool(), &EmptiestPu::new());
        assert_eq!(slicing.unassigned.len(), 3);

        let released = indexmap! {"sess".to_string() => 0, "req".to_string() => 0};
        let slicing = ResourceSlicer::slice(&released, pool(), &EmptiestPu::new());
        assert!(slicing.slices.values().all(|slice| slice.pus.is_empty()));
        assert_eq!(slicing.unassigned.len(), 5);
    }

    #[test]
    fn shortfall_is_reported_as_congestion() {
        let expected = indexmap! {"sess".to_string() => 20};
        let slicing = ResourceSlicer::slice(&expected, pool(), &EmptiestPu::new());
        let sess = &slicing.slices["sess"];
        // The whole pool is drawn and still falls short of the target.
        assert_eq!(sess.capacity, 11);
        assert!(sess.congested());
        assert!(slicing.unassigned.is_empty());
    }
}
