//! DVFS table power model.

use crate::power::PowerModel;

/// A power model driven by a table of DVFS operating points.
///
/// Each operating point pairs the maximum utilization it can serve with the power drawn while
/// running at it. The unit is assumed to select the lowest operating point able to serve the
/// current utilization, so the utilization is rounded up to the next configured point.
#[derive(Clone)]
pub struct DvfsPowerModel {
    /// (utilization, power) pairs in ascending utilization order.
    steps: Vec<(f64, f64)>,
}

impl DvfsPowerModel {
    /// Creates a DVFS power model from operating points given as (utilization, power) pairs.
    ///
    /// The table must be non-empty and sorted by ascending utilization, with the last point
    /// covering full utilization.
    pub fn new(steps: Vec<(f64, f64)>) -> Self {
        assert!(!steps.is_empty(), "DVFS table must not be empty");
        for pair in steps.windows(2) {
            assert!(
                pair[0].0 < pair[1].0,
                "DVFS operating points must be sorted by ascending utilization"
            );
        }
        assert!(
            steps.last().unwrap().0 >= 1.0,
            "Last DVFS operating point must cover full utilization"
        );
        Self { steps }
    }
}

impl PowerModel for DvfsPowerModel {
    fn get_power(&self, utilization: f64) -> f64 {
        for &(max_util, power) in &self.steps {
            if utilization <= max_util {
                return power;
            }
        }
        self.steps.last().unwrap().1
    }
}
