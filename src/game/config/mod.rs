//! Config Module
//!
//! Simulation tuning loaded from defaults or a JSON file.

pub mod simulation_config;

pub use simulation_config::{BodyConfig, ConfigError, FractureConfig, SimulationConfig};
