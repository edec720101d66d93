//! Linear temperature model.

use crate::thermal::TemperatureModel;

/// A temperature model interpolating linearly between idle and full-load temperature.
#[derive(Clone)]
pub struct LinearTemperatureModel {
    idle_temperature: f64,
    max_temperature: f64,
}

impl LinearTemperatureModel {
    /// Creates a linear temperature model.
    ///
    /// * `idle_temperature` - The temperature in Celsius degrees at 0% utilization.
    /// * `max_temperature` - The temperature in Celsius degrees at 100% utilization.
    pub fn new(idle_temperature: f64, max_temperature: f64) -> Self {
        assert!(
            max_temperature >= idle_temperature,
            "Full-load temperature must not be below idle temperature"
        );
        Self {
            idle_temperature,
            max_temperature,
        }
    }
}

impl TemperatureModel for LinearTemperatureModel {
    fn get_temperature(&self, utilization: f64) -> f64 {
        self.idle_temperature + (self.max_temperature - self.idle_temperature) * utilization
    }
}
