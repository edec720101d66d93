//! Mapping strategy implementations.

pub mod emptiest_pu;
pub mod first_fit;
pub mod fullest_pu;
pub mod longest_queue;
pub mod shortest_queue;
pub mod smallest_power_increment;
