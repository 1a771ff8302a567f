//! Projectile spawn requests
//!
//! The input layer produces a world-space origin and direction; a
//! [`SpawnRequest`] turns that into the description of a dynamic sphere.
//!
//! # Example
//!
//! ```ignore
//! use shatterbox_engine::physics::projectile::{ProjectileConfig, SpawnRequest};
//! use glam::Vec3;
//!
//! let config = ProjectileConfig::default();
//! let request = SpawnRequest::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), config.speed);
//! assert_eq!(request.velocity(), Vec3::new(0.0, 0.0, 24.0));
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::error::InvalidShapeError;
use super::factory::RigidBodyDesc;
use super::shape::CollisionShape;

/// Physical properties of launched balls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    /// Mass of the ball (kilograms)
    pub mass: f32,
    /// Radius of the ball (meters)
    pub radius: f32,
    /// Launch speed used by `SpawnRequest::launch` (meters/second)
    pub speed: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            mass: 35.0,
            radius: 0.4,
            speed: 24.0,
        }
    }
}

/// "Spawn a dynamic sphere at `origin` moving along `direction`."
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
}

impl SpawnRequest {
    pub fn new(origin: Vec3, direction: Vec3, speed: f32) -> Self {
        Self {
            origin,
            direction,
            speed,
        }
    }

    /// Request at the configured launch speed.
    pub fn launch(origin: Vec3, direction: Vec3, config: &ProjectileConfig) -> Self {
        Self::new(origin, direction, config.speed)
    }

    /// Initial velocity: the direction is normalized; a zero direction yields zero velocity.
    pub fn velocity(&self) -> Vec3 {
        self.direction.normalize_or_zero() * self.speed
    }

    /// Body description of the ball, centred on `origin`.
    pub fn body_desc(&self, config: &ProjectileConfig) -> Result<RigidBodyDesc, InvalidShapeError> {
        let shape = CollisionShape::sphere(config.radius)?;
        Ok(RigidBodyDesc::new(shape, config.mass)
            .with_position(self.origin)
            .with_linear_velocity(self.velocity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projectile_config_default() {
        let config = ProjectileConfig::default();
        assert_eq!(config.mass, 35.0);
        assert_eq!(config.radius, 0.4);
        assert_eq!(config.speed, 24.0);
    }

    #[test]
    fn test_velocity_uses_normalized_direction() {
        let request = SpawnRequest::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0), 24.0);
        assert!((request.velocity() - Vec3::new(0.0, 0.0, 24.0)).length() < 1e-5);

        let still = SpawnRequest::new(Vec3::ZERO, Vec3::ZERO, 24.0);
        assert_eq!(still.velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_body_desc() {
        let config = ProjectileConfig::default();
        let request = SpawnRequest::launch(Vec3::new(1.0, 2.0, 3.0), Vec3::X, &config);
        let desc = request.body_desc(&config).unwrap();
        assert_eq!(desc.mass, 35.0);
        assert_eq!(desc.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(desc.linear_velocity, Some(Vec3::new(24.0, 0.0, 0.0)));
        assert!(desc.shape.is_sphere());
        assert_eq!(desc.shape.margin(), 0.4);
    }

    #[test]
    fn test_bad_radius_rejected() {
        let config = ProjectileConfig {
            radius: -1.0,
            ..ProjectileConfig::default()
        };
        let request = SpawnRequest::new(Vec3::ZERO, Vec3::Z, 1.0);
        assert_eq!(
            request.body_desc(&config).unwrap_err(),
            InvalidShapeError::InvalidDimensions
        );
    }
}
