//! Simulation configuration.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use edgesim_models::cooling::CoolingPowerModel;
use edgesim_models::cooling_models::constant::ConstantCoolingPowerModel;
use edgesim_models::cooling_models::cop::CopCoolingPowerModel;
use edgesim_models::power::PowerModel;
use edgesim_models::power_models::constant::ConstantPowerModel;
use edgesim_models::power_models::dvfs::DvfsPowerModel;
use edgesim_models::power_models::linear::LinearPowerModel;
use edgesim_models::thermal::TemperatureModel;
use edgesim_models::thermal_models::constant::ConstantTemperatureModel;
use edgesim_models::thermal_models::linear::LinearTemperatureModel;

/// Processing-time model of a service.
///
/// `Uniform` times are sampled from the simulation-wide random number generator when the task
/// is admitted.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcTimeModelConfig {
    Constant { value: f64 },
    Uniform { min: f64, max: f64 },
}

impl ProcTimeModelConfig {
    /// Returns the expected processing time, used by queue-time and deadline estimates.
    pub fn expected(&self) -> f64 {
        match self {
            ProcTimeModelConfig::Constant { value } => *value,
            ProcTimeModelConfig::Uniform { min, max } => (min + max) / 2.,
        }
    }
}

/// Holds configuration of a single service offered to clients.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Service name.
    pub id: String,
    /// Relative deadline of a request in seconds, counted from its sending time.
    pub deadline: f64,
    /// Whether requests of this service must run within a previously opened session.
    pub session_required: bool,
    /// Maximum number of tasks of this service running in parallel on one processing unit.
    pub max_parallel_tasks: u32,
    /// Processing-time model of the service's tasks.
    pub proc_time: ProcTimeModelConfig,
    /// Whether the service keeps a continuous stream open between requests.
    #[serde(default)]
    pub stream: bool,
}

/// Hosting parameters of one service on one processing unit type.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PuServiceConfig {
    /// Maximum number of concurrent sessions (session services) or tasks (best-effort services).
    pub max_concurrent: u32,
    /// Duration of the session opening handshake in seconds.
    #[serde(default)]
    pub t_open: f64,
    /// Duration of the session closing handshake in seconds.
    #[serde(default)]
    pub t_close: f64,
}

impl PuServiceConfig {
    /// Utilization share granted to one running process of the service, in percent.
    pub fn share(&self) -> f64 {
        100. / self.max_concurrent as f64
    }
}

/// Power model configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PowerModelConfig {
    Constant { power: f64 },
    Linear { idle_power: f64, max_power: f64 },
    Dvfs { steps: Vec<(f64, f64)> },
}

/// Temperature model configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemperatureModelConfig {
    Constant { temperature: f64 },
    Linear { idle_temperature: f64, max_temperature: f64 },
}

/// Cooling power model configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoolingModelConfig {
    Constant { power: f64 },
    Cop { cop: f64 },
}

/// Holds configuration of a single processing unit.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PuConfig {
    /// Processing unit name, unique within its EDC.
    pub id: String,
    /// Hardware type tag, reported for monitoring purposes.
    pub pu_type: String,
    /// Duration of switching the unit on in seconds.
    #[serde(default)]
    pub t_on: f64,
    /// Duration of switching the unit off in seconds.
    #[serde(default)]
    pub t_off: f64,
    /// Hosting parameters per supported service.
    pub services: IndexMap<String, PuServiceConfig>,
    /// Power model of the unit.
    pub power: PowerModelConfig,
    /// Temperature model of the unit.
    pub temperature: TemperatureModelConfig,
    /// Scheduling strategy id, e.g. `FCFS` or `EDF`.
    pub scheduling: String,
}

/// Holds configuration of a single edge data center.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct EdcConfig {
    /// Edge data center name.
    pub id: String,
    /// Processing units composing the EDC pool.
    pub pus: Vec<PuConfig>,
    /// Mapping strategy id, e.g. `EmptiestPu` or `FirstFit`.
    pub mapping: String,
    /// Capacity reservation targets per service applied at construction time.
    #[serde(default)]
    pub initial_slicing: IndexMap<String, u32>,
    /// Whether sliced processing units are kept powered on while idle.
    #[serde(default)]
    pub hot_standby: bool,
    /// Cooling power model of the EDC.
    pub cooling: CoolingModelConfig,
    /// Temperature model of the EDC machine room, driven by relative IT load.
    pub edc_temperature: TemperatureModelConfig,
    /// IT power draw in W treated as full load by the EDC temperature model.
    pub rated_it_power: f64,
    /// Name of the parent (cloud) server requests are forwarded to when the pool is exhausted.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Top-level simulation scenario: the service catalog and the EDC federation.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ScenarioConfig {
    pub services: Vec<ServiceConfig>,
    pub edcs: Vec<EdcConfig>,
}

impl ScenarioConfig {
    /// Creates scenario config by reading parameter values from YAML file.
    pub fn from_file(file_name: &str) -> Self {
        serde_yaml::from_str(
            &std::fs::read_to_string(file_name).unwrap_or_else(|_| panic!("Can't read file {}", file_name)),
        )
        .unwrap_or_else(|_| panic!("Can't parse YAML from file {}", file_name))
    }

    /// Returns the service catalog as a map keyed by service id.
    pub fn service_map(&self) -> HashMap<String, ServiceConfig> {
        self.services.iter().map(|s| (s.id.clone(), s.clone())).collect()
    }
}

/// Resolves power model config into a model instance.
pub fn power_model_resolver(config: &PowerModelConfig) -> Box<dyn PowerModel> {
    match config {
        PowerModelConfig::Constant { power } => Box::new(ConstantPowerModel::new(*power)),
        PowerModelConfig::Linear { idle_power, max_power } => Box::new(LinearPowerModel::new(*idle_power, *max_power)),
        PowerModelConfig::Dvfs { steps } => Box::new(DvfsPowerModel::new(steps.clone())),
    }
}

/// Resolves temperature model config into a model instance.
pub fn temperature_model_resolver(config: &TemperatureModelConfig) -> Box<dyn TemperatureModel> {
    match config {
        TemperatureModelConfig::Constant { temperature } => Box::new(ConstantTemperatureModel::new(*temperature)),
        TemperatureModelConfig::Linear {
            idle_temperature,
            max_temperature,
        } => Box::new(LinearTemperatureModel::new(*idle_temperature, *max_temperature)),
    }
}

/// Resolves cooling model config into a model instance.
pub fn cooling_model_resolver(config: &CoolingModelConfig) -> Box<dyn CoolingPowerModel> {
    match config {
        CoolingModelConfig::Constant { power } => Box::new(ConstantCoolingPowerModel::new(*power)),
        CoolingModelConfig::Cop { cop } => Box::new(CopCoolingPowerModel::new(*cop)),
    }
}

/// Splits config string into strategy name and options string.
///
/// Strategy ids follow the `Name[option1=value1,option2=value2]` form; the bracket part is
/// optional.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.to_string(), value.to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_value() {
        assert_eq!(parse_config_value("FirstFit"), ("FirstFit".to_string(), None));
        let (name, options) = parse_config_value("EmptiestPu[alpha=0.5]");
        assert_eq!(name, "EmptiestPu");
        assert_eq!(options.unwrap(), "alpha=0.5");
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options("option1=0.8,option2=something");
        assert_eq!(options.get("option1").unwrap(), "0.8");
        assert_eq!(options.get("option2").unwrap(), "something");
        assert_eq!(options.get("option3"), None);
    }
}
