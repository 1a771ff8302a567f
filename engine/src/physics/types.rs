//! Physics type re-exports from glam
//!
//! This module provides the core mathematical types used throughout
//! the physics system, re-exported from the glam library, plus the two
//! small value types the simulation is built on: a rigid [`Transform`]
//! and an axis-aligned bounding box ([`Aabb`]).

pub use glam::{Mat3, Quat, Vec3};

use serde::{Deserialize, Serialize};

/// Rigid transform: translation plus unit-quaternion orientation.
///
/// Bodies are centred on their transform origin, so `position` is also
/// the centre of mass used by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World-space position (meters)
    pub position: Vec3,
    /// World-space orientation (unit quaternion)
    pub orientation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform (origin, no rotation).
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Create a transform from a position and orientation.
    ///
    /// The orientation is normalized; a zero-length quaternion becomes identity.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        let orientation = if orientation.length_squared() > f32::EPSILON {
            orientation.normalize()
        } else {
            Quat::IDENTITY
        };
        Self {
            position,
            orientation,
        }
    }

    /// Translation-only transform.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Map a local-space point to world space.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// Map a world-space point to local space.
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation.inverse() * (point - self.position)
    }

    /// Rotate a local-space direction into world space.
    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.orientation * vector
    }

    /// Rotate a world-space direction into local space.
    #[inline]
    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.orientation.inverse() * vector
    }

    /// Rotation matrix of the orientation.
    #[inline]
    pub fn basis(&self) -> Mat3 {
        Mat3::from_quat(self.orientation)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An inverted box that any `grow` call will replace.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centred at `center` with the given half extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box containing every point; `EMPTY` for no points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &point in points {
            aabb.grow(point);
        }
        aabb
    }

    /// Extend the box to contain `point`.
    #[inline]
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Box grown by `amount` on every side.
    pub fn expanded(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Overlap test (touching counts as overlapping).
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// World-space bounds of this local box under `transform`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        let center = transform.transform_point(self.center());
        let basis = transform.basis();
        let half = self.half_extents();
        let world_half = Vec3::new(
            basis.row(0).abs().dot(half),
            basis.row(1).abs().dot(half),
            basis.row(2).abs().dot(half),
        );
        Self::from_center_half_extents(center, world_half)
    }
}
