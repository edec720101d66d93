//! Processing unit mapping strategies.

use crate::core::config::parse_config_value;
use crate::core::mapping_strategies::emptiest_pu::EmptiestPu;
use crate::core::mapping_strategies::first_fit::FirstFit;
use crate::core::mapping_strategies::fullest_pu::FullestPu;
use crate::core::mapping_strategies::longest_queue::LongestQueue;
use crate::core::mapping_strategies::shortest_queue::ShortestQueue;
use crate::core::mapping_strategies::smallest_power_increment::SmallestPowerIncrement;

/// Read-only view of a processing unit exposed to planning components.
///
/// Implemented both by the live processing unit and by its disposable digital twin, so mapping
/// strategies and the resource slicer can rank candidates without mutating real state.
pub trait PuView {
    /// Returns the processing unit name.
    fn pu_id(&self) -> &str;

    /// Returns how many further concurrent sessions or tasks of the service the unit could
    /// accept given its current occupancy; 0 when it cannot host the service at all.
    fn additional_capacity(&self, service_id: &str) -> u32;

    /// Returns the same query assuming the unit were empty.
    fn max_capacity(&self, service_id: &str) -> u32;

    /// Returns the occupied fraction of the capacity dedicated to the bound service,
    /// 0 for an idle unbound unit.
    fn occupancy_ratio(&self) -> f64;

    /// Returns the queue-time estimate for new work of the service.
    fn queue_time(&self, service_id: &str) -> f64;

    /// Returns the marginal power cost of accepting one more process of the service.
    fn power_increment(&self, service_id: &str) -> f64;
}

/// Trait for implementation of processing unit mapping strategies.
///
/// The strategy is defined as a fitness function over candidate units: `None` marks a unit that
/// cannot accept more work of the service, any other value is a comparable score where lower is
/// better. Mapping picks the best-scored unit, slicing consumes the whole priority-ordered queue.
pub trait MappingStrategy {
    /// Returns the score of the unit for the service, `None` if it cannot accept it.
    fn fitness(&self, pu: &dyn PuView, service_id: &str) -> Option<f64>;

    /// Returns the index of the best-scored eligible unit, ties broken by candidate order.
    fn map_task(&self, service_id: &str, pus: &[&dyn PuView]) -> Option<usize> {
        let mut result = None;
        let mut best = f64::INFINITY;
        for (i, pu) in pus.iter().enumerate() {
            if let Some(score) = self.fitness(*pu, service_id) {
                if score < best {
                    best = score;
                    result = Some(i);
                }
            }
        }
        result
    }

    /// Returns the indices of all eligible units ordered by ascending score.
    fn map_priority_queue(&self, service_id: &str, pus: &[&dyn PuView]) -> Vec<usize> {
        let mut scored: Vec<(usize, f64)> = pus
            .iter()
            .enumerate()
            .filter_map(|(i, pu)| self.fitness(*pu, service_id).map(|score| (i, score)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.into_iter().map(|(i, _)| i).collect()
    }
}

/// Resolves mapping strategy id into a strategy instance.
pub fn mapping_strategy_resolver(config_str: &str) -> Box<dyn MappingStrategy> {
    let (name, _options) = parse_config_value(config_str);
    match name.as_str() {
        "FirstFit" => Box::new(FirstFit::new()),
        "FullestPu" => Box::new(FullestPu::new()),
        "EmptiestPu" => Box::new(EmptiestPu::new()),
        "ShortestQueue" => Box::new(ShortestQueue::new()),
        "LongestQueue" => Box::new(LongestQueue::new()),
        "SmallestPowerIncrement" => Box::new(SmallestPowerIncrement::new()),
        _ => panic!("Can't resolve: {}", config_str),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use edgesim_models::power_models::linear::LinearPowerModel;

    use super::*;
    use crate::core::config::PuServiceConfig;
    use crate::core::pu_twin::PuTwin;

    fn twin(pu_id: &str, max_concurrent: u32, max_power: f64) -> PuTwin {
        let mut services = IndexMap::new();
        services.insert(
            "sess".to_string(),
            PuServiceConfig {
                max_concurrent,
                t_open: 0.,
                t_close: 0.,
            },
        );
        PuTwin::new(pu_id, services, Box::new(LinearPowerModel::new(0., max_power)))
    }

    #[test]
    fn first_fit_returns_first_eligible() {
        let mut full = twin("pu_a", 1, 100.);
        full.occupy("sess", 1);
        let free = twin("pu_b", 1, 100.);
        let other = twin("pu_c", 1, 100.);
        let pus: Vec<&dyn PuView> = vec![&full, &free, &other];
        assert_eq!(FirstFit::new().map_task("sess", &pus), Some(1));
    }

    #[test]
    fn emptiest_and_fullest_rank_by_occupancy() {
        let mut half = twin("pu_a", 2, 100.);
        half.occupy("sess", 1);
        let empty = twin("pu_b", 2, 100.);
        let pus: Vec<&dyn PuView> = vec![&half, &empty];
        assert_eq!(EmptiestPu::new().map_task("sess", &pus), Some(1));
        assert_eq!(FullestPu::new().map_task("sess", &pus), Some(0));
    }

    #[test]
    fn smallest_power_increment_prefers_cheaper_unit() {
        let cheap = twin("pu_a", 2, 100.);
        let hungry = twin("pu_b", 2, 300.);
        let pus: Vec<&dyn PuView> = vec![&hungry, &cheap];
        assert_eq!(SmallestPowerIncrement::new().map_task("sess", &pus), Some(1));
    }

    #[test]
    fn priority_queue_keeps_only_eligible_units_in_score_order() {
        let mut full = twin("pu_a", 1, 100.);
        full.occupy("sess", 1);
        let mut half = twin("pu_b", 2, 100.);
        half.occupy("sess", 1);
        let empty = twin("pu_c", 2, 100.);
        let pus: Vec<&dyn PuView> = vec![&full, &half, &empty];
        assert_eq!(EmptiestPu::new().map_priority_queue("sess", &pus), vec![2, 1]);
    }

    #[test]
    fn ties_are_broken_by_candidate_order() {
        let a = twin("pu_a", 2, 100.);
        let b = twin("pu_b", 2, 100.);
        let pus: Vec<&dyn PuView> = vec![&a, &b];
        assert_eq!(EmptiestPu::new().map_task("sess", &pus), Some(0));
    }

    #[test]
    #[should_panic(expected = "Can't resolve")]
    fn unknown_strategy_is_fatal() {
        mapping_strategy_resolver("BestEffort");
    }
}
