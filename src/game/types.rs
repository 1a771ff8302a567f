//! Shared Types Module
//!
//! Render-facing data exchanged with the external scene: object ids,
//! geometry descriptors, lifecycle events and GPU instance records.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

pub use crate::physics::body::ObjectId;

// ============================================================================
// OBJECT IDS
// ============================================================================

/// Hands out render object ids in increasing order, starting at 1.
#[derive(Debug, Clone, Default)]
pub struct ObjectIdAllocator {
    last: u32,
}

impl ObjectIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ObjectId {
        self.last = self.last.wrapping_add(1);
        ObjectId(self.last)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.last
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Triangle mesh handed to the render layer: flat `x, y, z` positions in
/// object space and triangle indices into them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryDescriptor {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl GeometryDescriptor {
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned box centred on the origin (24 vertices, 12 triangles).
    pub fn from_box(half_extents: Vec3) -> Self {
        let (hx, hy, hz) = (half_extents.x, half_extents.y, half_extents.z);
        let corners = [
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
        ];
        let faces = [
            [0, 3, 2, 1],
            [5, 6, 7, 4],
            [4, 7, 3, 0],
            [1, 2, 6, 5],
            [3, 7, 6, 2],
            [4, 0, 1, 5],
        ];

        let mut positions = Vec::with_capacity(24 * 3);
        let mut indices = Vec::with_capacity(36);
        for face in &faces {
            let base = (positions.len() / 3) as u32;
            for &i in face {
                positions.extend_from_slice(&corners[i].to_array());
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self { positions, indices }
    }

    /// Latitude/longitude sphere centred on the origin.
    pub fn uv_sphere(radius: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut positions = Vec::new();
        let mut indices = Vec::new();

        for lat in 0..=segments {
            let theta = (lat as f32) * std::f32::consts::PI / (segments as f32);
            let (sin_theta, cos_theta) = theta.sin_cos();
            for lon in 0..=segments {
                let phi = (lon as f32) * 2.0 * std::f32::consts::PI / (segments as f32);
                let (sin_phi, cos_phi) = phi.sin_cos();
                let p = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi) * radius;
                positions.extend_from_slice(&p.to_array());
            }
        }

        for lat in 0..segments {
            for lon in 0..segments {
                let first = lat * (segments + 1) + lon;
                let second = first + segments + 1;
                indices.extend_from_slice(&[first, first + 1, second]);
                indices.extend_from_slice(&[second, first + 1, second + 1]);
            }
        }
        Self { positions, indices }
    }
}

/// Asset-layer description of a mesh-backed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDescriptor {
    /// Flat vertex coordinates in object space.
    pub positions: Vec<f32>,
    pub mass: f32,
    pub breakable: bool,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "identity_orientation")]
    pub orientation: Quat,
    /// Triangle indices for rendering; a convex hull is used when empty.
    #[serde(default)]
    pub indices: Vec<u32>,
}

fn identity_orientation() -> Quat {
    Quat::IDENTITY
}

impl MeshDescriptor {
    pub fn new(positions: Vec<f32>, mass: f32, breakable: bool) -> Self {
        Self {
            positions,
            mass,
            breakable,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            indices: Vec::new(),
        }
    }

    pub fn at(mut self, position: Vec3, orientation: Quat) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Output of the simulation core to the render layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SceneEvent {
    /// World transform of a live dynamic object after a step.
    TransformUpdated {
        object: ObjectId,
        position: Vec3,
        orientation: Quat,
    },
    /// A new renderable object exists (scene setup, projectile or debris).
    ObjectCreated {
        object: ObjectId,
        geometry: GeometryDescriptor,
    },
    /// The object left the simulation and must disappear from the render scene.
    ObjectDestroyed { object: ObjectId },
}

impl SceneEvent {
    pub fn object(&self) -> ObjectId {
        match self {
            SceneEvent::TransformUpdated { object, .. }
            | SceneEvent::ObjectCreated { object, .. }
            | SceneEvent::ObjectDestroyed { object } => *object,
        }
    }
}

// ============================================================================
// GPU INSTANCE TYPES
// ============================================================================

/// Per-object transform record for instanced rendering.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub position: [f32; 3],
    pub object_id: u32,
    /// Quaternion `x, y, z, w`.
    pub orientation: [f32; 4],
}

assert_eq_size!(InstanceTransform, [u8; 32]);

impl InstanceTransform {
    pub fn new(object: ObjectId, position: Vec3, orientation: Quat) -> Self {
        Self {
            position: position.to_array(),
            object_id: object.0,
            orientation: orientation.to_array(),
        }
    }
}
