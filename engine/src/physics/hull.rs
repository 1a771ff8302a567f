//! Convex hull collision shapes built from raw mesh coordinates.
//!
//! A [`ConvexHullShape`] is an unordered point cloud whose convex hull is the
//! collision geometry; the narrowphase only ever asks it for support points,
//! so no faces are computed here. [`ConvexHullBuilder`] turns a flat vertex
//! buffer (`x, y, z, x, y, z, ...`) into a margin-inflated [`CollisionShape`].

use glam::Vec3;

use super::error::InvalidShapeError;
use super::shape::{CollisionShape, DEFAULT_COLLISION_MARGIN};
use super::types::Aabb;

/// Point cloud whose convex hull is used for collision detection.
///
/// Points are kept in insertion order and never deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ConvexHullShape {
    points: Vec<Vec3>,
    local_aabb: Aabb,
}

impl ConvexHullShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            local_aabb: Aabb::EMPTY,
        }
    }

    /// Append a hull point.
    ///
    /// `recalculate_local_aabb` is set for the final point of a batch so the
    /// bounds are rebuilt once instead of per point.
    pub fn add_point(&mut self, point: Vec3, recalculate_local_aabb: bool) {
        self.points.push(point);
        if recalculate_local_aabb {
            self.local_aabb = Aabb::from_points(&self.points);
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounds of the raw points (without margin).
    ///
    /// Only valid after a point was added with `recalculate_local_aabb`.
    pub fn local_aabb(&self) -> Aabb {
        self.local_aabb
    }

    /// Furthest point along `direction` (unnormalized is fine).
    pub fn support_point(&self, direction: Vec3) -> Vec3 {
        let mut best = Vec3::ZERO;
        let mut best_dot = f32::NEG_INFINITY;
        for &point in &self.points {
            let d = point.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = point;
            }
        }
        best
    }
}

/// Builds convex hull collision shapes from flat coordinate buffers.
#[derive(Debug, Clone, Copy)]
pub struct ConvexHullBuilder {
    margin: f32,
}

impl Default for ConvexHullBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_COLLISION_MARGIN)
    }
}

impl ConvexHullBuilder {
    /// Create a builder that applies `margin` to every shape it produces.
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Build a hull shape from vertex coordinate triplets.
    ///
    /// Triplets are added in input order; the final one triggers the local
    /// bounds computation. Every input point lies inside the returned shape.
    ///
    /// # Errors
    /// [`InvalidShapeError`] when the buffer is empty, ragged (length not a
    /// multiple of 3) or contains NaN/infinite values, and
    /// [`InvalidShapeError::DegenerateHull`] when the points are coincident,
    /// collinear or coplanar.
    pub fn build_from_positions(&self, coords: &[f32]) -> Result<CollisionShape, InvalidShapeError> {
        if coords.is_empty() {
            return Err(InvalidShapeError::EmptyGeometry);
        }
        let triplets: &[[f32; 3]] = bytemuck::try_cast_slice(coords)
            .map_err(|_| InvalidShapeError::RaggedCoordinates(coords.len()))?;
        if let Some(index) = coords.iter().position(|c| !c.is_finite()) {
            return Err(InvalidShapeError::NonFinite(index));
        }

        let mut hull = ConvexHullShape::with_capacity(triplets.len());
        let last = triplets.len() - 1;
        for (i, triplet) in triplets.iter().enumerate() {
            hull.add_point(Vec3::from_array(*triplet), i == last);
        }
        if !spans_volume(hull.points()) {
            return Err(InvalidShapeError::DegenerateHull);
        }

        CollisionShape::convex_hull(hull, self.margin)
    }
}

/// Relative extent below which a point cloud counts as flat.
const DEGENERACY_TOLERANCE: f32 = 1e-6;

/// Whether the points span all three dimensions.
///
/// Picks the farthest point from the first, then the farthest from that
/// line, then the farthest from that plane; each must stand clear of the
/// previous feature by more than the tolerance scaled to the cloud's extent.
fn spans_volume(points: &[Vec3]) -> bool {
    let Some(&origin) = points.first() else {
        return false;
    };
    let Some(axis_end) = points
        .iter()
        .copied()
        .max_by(|a, b| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)))
    else {
        return false;
    };
    let axis = axis_end - origin;
    let extent = axis.length();
    let tolerance = DEGENERACY_TOLERANCE * extent.max(1.0);
    if extent <= tolerance {
        return false;
    }
    let axis = axis / extent;

    let Some(plane_end) = points
        .iter()
        .copied()
        .max_by(|a, b| {
            axis.cross(*a - origin)
                .length_squared()
                .total_cmp(&axis.cross(*b - origin).length_squared())
        })
    else {
        return false;
    };
    let normal = axis.cross(plane_end - origin);
    if normal.length() <= tolerance {
        return false;
    }
    let normal = normal.normalize();

    points
        .iter()
        .any(|&p| normal.dot(p - origin).abs() > tolerance)
}
