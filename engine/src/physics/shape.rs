//! Collision shapes
//!
//! Every shape is described as a *core* (a finite point set) inflated by a
//! radius. The narrowphase runs GJK/EPA on the cores and adds the two
//! inflation radii afterwards, which keeps rounded contacts stable:
//!
//! | Shape       | Core                          | Inflation |
//! |-------------|-------------------------------|-----------|
//! | Sphere      | the centre                    | radius    |
//! | Cuboid      | 8 corners shrunk by the margin| margin    |
//! | Convex hull | the hull points               | margin    |
//!
//! So a cuboid keeps its nominal half extents while a hull grows by the
//! margin on every side.

use glam::Vec3;

use super::error::InvalidShapeError;
use super::hull::ConvexHullShape;
use super::types::{Aabb, Transform};

/// Collision margin applied to hulls and boxes unless configured otherwise.
pub const DEFAULT_COLLISION_MARGIN: f32 = 0.05;

const SPHERE_CORE: [Vec3; 1] = [Vec3::ZERO];

#[derive(Debug, Clone)]
pub enum ShapeKind {
    Sphere {
        radius: f32,
    },
    Cuboid {
        half_extents: Vec3,
        corners: [Vec3; 8],
    },
    ConvexHull(ConvexHullShape),
}

/// Convex collision geometry owned by exactly one body.
#[derive(Debug, Clone)]
pub struct CollisionShape {
    kind: ShapeKind,
    margin: f32,
    local_aabb: Aabb,
}

fn positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

impl CollisionShape {
    /// Sphere centred on the body origin. Its margin is its radius.
    pub fn sphere(radius: f32) -> Result<Self, InvalidShapeError> {
        if !positive_finite(radius) {
            return Err(InvalidShapeError::InvalidDimensions);
        }
        Ok(Self {
            kind: ShapeKind::Sphere { radius },
            margin: radius,
            local_aabb: Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(radius)),
        })
    }

    /// Box with the given half extents; the margin is taken from inside them.
    pub fn cuboid(half_extents: Vec3, margin: f32) -> Result<Self, InvalidShapeError> {
        if !(positive_finite(half_extents.x)
            && positive_finite(half_extents.y)
            && positive_finite(half_extents.z))
            || !(margin.is_finite() && margin >= 0.0)
        {
            return Err(InvalidShapeError::InvalidDimensions);
        }
        let core = (half_extents - Vec3::splat(margin)).max(Vec3::ZERO);
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 == 0 { -core.x } else { core.x },
                if i & 2 == 0 { -core.y } else { core.y },
                if i & 4 == 0 { -core.z } else { core.z },
            );
        }
        Ok(Self {
            kind: ShapeKind::Cuboid {
                half_extents,
                corners,
            },
            margin,
            local_aabb: Aabb::from_center_half_extents(Vec3::ZERO, core + Vec3::splat(margin)),
        })
    }

    /// Hull over the given point cloud, inflated by `margin`.
    pub fn convex_hull(hull: ConvexHullShape, margin: f32) -> Result<Self, InvalidShapeError> {
        if hull.is_empty() {
            return Err(InvalidShapeError::EmptyGeometry);
        }
        if !(margin.is_finite() && margin >= 0.0) {
            return Err(InvalidShapeError::InvalidDimensions);
        }
        let local_aabb = Aabb::from_points(hull.points()).expanded(margin);
        Ok(Self {
            kind: ShapeKind::ConvexHull(hull),
            margin,
            local_aabb,
        })
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Collision margin (equal to the radius for spheres).
    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn is_sphere(&self) -> bool {
        matches!(self.kind, ShapeKind::Sphere { .. })
    }

    /// Points whose convex hull is the un-inflated core.
    pub fn core_points(&self) -> &[Vec3] {
        match &self.kind {
            ShapeKind::Sphere { .. } => &SPHERE_CORE,
            ShapeKind::Cuboid { corners, .. } => corners,
            ShapeKind::ConvexHull(hull) => hull.points(),
        }
    }

    /// Radius the core is inflated by.
    pub fn inflation(&self) -> f32 {
        self.margin
    }

    /// Furthest core point along `direction` in shape space.
    pub fn core_support(&self, direction: Vec3) -> Vec3 {
        match &self.kind {
            ShapeKind::Sphere { .. } => Vec3::ZERO,
            ShapeKind::Cuboid { corners, .. } => {
                let c = corners[7];
                Vec3::new(
                    if direction.x < 0.0 { -c.x } else { c.x },
                    if direction.y < 0.0 { -c.y } else { c.y },
                    if direction.z < 0.0 { -c.z } else { c.z },
                )
            }
            ShapeKind::ConvexHull(hull) => hull.support_point(direction),
        }
    }

    /// Full support point (core plus inflation) in shape space.
    pub fn support_local(&self, direction: Vec3) -> Vec3 {
        self.core_support(direction) + direction.normalize_or_zero() * self.margin
    }

    /// Local bounds including the margin.
    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        match self.kind {
            ShapeKind::Sphere { radius } => {
                Aabb::from_center_half_extents(transform.position, Vec3::splat(radius))
            }
            _ => self.local_aabb.transformed(transform),
        }
    }

    /// Diagonal of the principal inertia tensor for `mass`.
    ///
    /// Boxes and hulls use the box formula over their bounds; hulls add the
    /// margin to the half extents once more, matching solid-box inertia for
    /// polyhedra. Zero mass yields zero inertia.
    pub fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        if mass <= 0.0 {
            return Vec3::ZERO;
        }
        match &self.kind {
            ShapeKind::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            ShapeKind::Cuboid { .. } => box_inertia(mass, self.local_aabb.half_extents()),
            ShapeKind::ConvexHull(_) => box_inertia(
                mass,
                self.local_aabb.half_extents() + Vec3::splat(self.margin),
            ),
        }
    }
}

fn box_inertia(mass: f32, half_extents: Vec3) -> Vec3 {
    let l = half_extents * 2.0;
    let l2 = l * l;
    Vec3::new(l2.y + l2.z, l2.x + l2.z, l2.x + l2.y) * (mass / 12.0)
}
