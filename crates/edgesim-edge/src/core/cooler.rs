//! Power and thermal aggregation of an edge data center.

use edgesim_models::cooling::CoolingPowerModel;
use edgesim_models::thermal::TemperatureModel;

/// Converts the total IT power of the pool into a cooling power figure and an EDC temperature.
pub struct Cooler {
    cooling_model: Box<dyn CoolingPowerModel>,
    temperature_model: Box<dyn TemperatureModel>,
    /// IT power in W treated as full load by the temperature model.
    rated_it_power: f64,
    it_power: f64,
    cooling_power: f64,
    edc_temperature: f64,
}

impl Cooler {
    pub fn new(
        cooling_model: Box<dyn CoolingPowerModel>,
        temperature_model: Box<dyn TemperatureModel>,
        rated_it_power: f64,
    ) -> Self {
        assert!(rated_it_power > 0., "Rated IT power must be positive");
        let edc_temperature = temperature_model.get_temperature(0.);
        Self {
            cooling_model,
            temperature_model,
            rated_it_power,
            it_power: 0.,
            cooling_power: 0.,
            edc_temperature,
        }
    }

    /// Recomputes the cooling power and EDC temperature for the given IT power draw.
    pub fn update(&mut self, it_power: f64) -> (f64, f64) {
        self.it_power = it_power;
        self.cooling_power = self.cooling_model.get_power(it_power);
        let relative_load = (it_power / self.rated_it_power).clamp(0., 1.);
        self.edc_temperature = self.temperature_model.get_temperature(relative_load);
        (self.cooling_power, self.edc_temperature)
    }

    pub fn cooling_power(&self) -> f64 {
        self.cooling_power
    }

    pub fn edc_temperature(&self) -> f64 {
        self.edc_temperature
    }

    /// Power usage effectiveness of the EDC, 0 by convention while the pool draws no power.
    pub fn pue(&self) -> f64 {
        if self.it_power > 0. {
            (self.it_power + self.cooling_power) / self.it_power
        } else {
            0.
        }
    }
}
