//! Simulation Configuration
//!
//! Tuning for the destruction simulation: world stepping, body defaults,
//! fracture parameters and the per-pass removal budget. `Default` returns the
//! reference values; a JSON file may override any subset of fields.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::systems::removal_queue::DEFAULT_REMOVAL_CAPACITY;
use crate::physics::{DEFAULT_COLLISION_MARGIN, DEFAULT_FRICTION, ProjectileConfig, WorldConfig};

/// Defaults applied to every body the scene creates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Surface friction (combined multiplicatively per contact)
    pub friction: f32,
    /// Collision margin of convex hulls (meters)
    pub collision_margin: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            collision_margin: DEFAULT_COLLISION_MARGIN,
        }
    }
}

/// Fracture pass parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractureConfig {
    /// Contact impulse that must be exceeded to break a body (N·s)
    pub fracture_impulse: f32,
    /// Deepest recursion level of impact cuts
    pub max_cut_depth: u32,
    /// Upper bound on fragments produced by one fracture
    pub cuts_per_level: u32,
    /// Fragments at most this large (meters) are no longer breakable
    pub min_fragment_size: f32,
    /// Vertices this close to a cutting plane belong to both sides
    pub coplanar_tolerance: f32,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            fracture_impulse: 250.0,
            max_cut_depth: 1,
            cuts_per_level: 2,
            min_fragment_size: 1.4,
            coplanar_tolerance: 1e-4,
        }
    }
}

/// Central configuration for the destruction simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub body: BodyConfig,
    pub fracture: FractureConfig,
    pub projectile: ProjectileConfig,
    /// Bodies that may be removed per collision pass
    pub removal_queue_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            body: BodyConfig::default(),
            fracture: FractureConfig::default(),
            projectile: ProjectileConfig::default(),
            removal_queue_capacity: DEFAULT_REMOVAL_CAPACITY,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if !(world.fixed_time_step.is_finite() && world.fixed_time_step > 0.0) {
            return Err(ConfigError::Invalid("world.fixed_time_step must be positive".into()));
        }
        if !world.gravity.is_finite() {
            return Err(ConfigError::Invalid("world.gravity must be finite".into()));
        }
        if !(world.contact_breaking_threshold >= 0.0) {
            return Err(ConfigError::Invalid(
                "world.contact_breaking_threshold must not be negative".into(),
            ));
        }
        if !(self.body.collision_margin >= 0.0) {
            return Err(ConfigError::Invalid("body.collision_margin must not be negative".into()));
        }
        if !(self.fracture.fracture_impulse >= 0.0) {
            return Err(ConfigError::Invalid(
                "fracture.fracture_impulse must not be negative".into(),
            ));
        }
        if self.fracture.cuts_per_level == 0 {
            return Err(ConfigError::Invalid("fracture.cuts_per_level must be at least 1".into()));
        }
        if !(self.projectile.radius > 0.0 && self.projectile.mass > 0.0) {
            return Err(ConfigError::Invalid(
                "projectile radius and mass must be positive".into(),
            ));
        }
        if self.removal_queue_capacity == 0 {
            return Err(ConfigError::Invalid("removal_queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Errors from loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Json(e) => write!(f, "malformed config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_scene() {
        let config = SimulationConfig::new();
        assert_eq!(config.world.gravity, 7.8);
        assert_eq!(config.fracture.fracture_impulse, 250.0);
        assert_eq!(config.fracture.max_cut_depth, 1);
        assert_eq!(config.fracture.cuts_per_level, 2);
        assert_eq!(config.fracture.min_fragment_size, 1.4);
        assert_eq!(config.removal_queue_capacity, 500);
        assert_eq!(
            config.removal_queue_capacity,
            crate::game::systems::RemovalQueue::default().capacity()
        );
        assert_eq!(config.body.friction, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            SimulationConfig::from_json_str(r#"{"fracture": {"fracture_impulse": 100.0}}"#).unwrap();
        assert_eq!(config.fracture.fracture_impulse, 100.0);
        assert_eq!(config.fracture.cuts_per_level, 2);
        assert_eq!(config.world.gravity, 7.8);
        assert_eq!(config.removal_queue_capacity, 500);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimulationConfig::from_json_str(r#"{"removal_queue_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = SimulationConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"world": {{"gravity": 9.81}}}}"#).unwrap();
        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.world.gravity, 9.81);

        let missing = SimulationConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::new();
        let json = config.to_json_string().unwrap();
        assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), config);
    }
}
