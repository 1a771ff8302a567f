//! Contact manifolds
//!
//! A [`ContactManifold`] is the per-step snapshot of contact between two
//! bodies: up to [`MAX_CONTACT_POINTS`] points, each carrying the applied
//! normal impulse written by the solver.
//!
//! Conventions:
//! - `normal_world_on_b` is a unit vector on body 1 pointing toward body 0.
//! - `distance` is negative when the surfaces penetrate.
//! - `position_world_on_a == position_world_on_b + normal_world_on_b * distance`.

use glam::Vec3;

use crate::physics::body::BodyHandle;

pub const MAX_CONTACT_POINTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    pub position_world_on_a: Vec3,
    pub position_world_on_b: Vec3,
    pub normal_world_on_b: Vec3,
    pub distance: f32,
    /// Accumulated normal impulse of the last sub-step (N·s).
    pub applied_impulse: f32,
}

impl ContactPoint {
    /// Point on body 1 with its normal and signed distance; the body 0 point
    /// is derived from them.
    pub fn new(position_world_on_b: Vec3, normal_world_on_b: Vec3, distance: f32) -> Self {
        Self {
            position_world_on_a: position_world_on_b + normal_world_on_b * distance,
            position_world_on_b,
            normal_world_on_b,
            distance,
            applied_impulse: 0.0,
        }
    }

    pub fn with_applied_impulse(mut self, impulse: f32) -> Self {
        self.applied_impulse = impulse;
        self
    }

    pub fn is_penetrating(&self) -> bool {
        self.distance < 0.0
    }
}

/// Contact between `body0` and `body1` during one step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    body0: BodyHandle,
    body1: BodyHandle,
    points: Vec<ContactPoint>,
}

impl ContactManifold {
    pub fn new(body0: BodyHandle, body1: BodyHandle) -> Self {
        Self {
            body0,
            body1,
            points: Vec::with_capacity(MAX_CONTACT_POINTS),
        }
    }

    pub fn body0(&self) -> BodyHandle {
        self.body0
    }

    pub fn body1(&self) -> BodyHandle {
        self.body1
    }

    /// Append a point; returns `false` when the manifold is full.
    pub fn add_point(&mut self, point: ContactPoint) -> bool {
        if self.points.len() >= MAX_CONTACT_POINTS {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn with_point(mut self, point: ContactPoint) -> Self {
        self.add_point(point);
        self
    }

    pub fn points(&self) -> &[ContactPoint] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [ContactPoint] {
        &mut self.points
    }

    pub fn num_contacts(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Candidate contact before it is committed to a manifold.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContactCandidate {
    pub point_a: Vec3,
    pub point_b: Vec3,
    pub separation: f32,
}

/// Keep at most four candidates: the deepest, the one farthest from it, the
/// one spanning the largest triangle with those two and the one on the other
/// side of their edge that spans the largest area.
pub(crate) fn reduce_candidates(candidates: &mut Vec<ContactCandidate>, normal: Vec3) {
    if candidates.len() <= MAX_CONTACT_POINTS {
        candidates.sort_by(|a, b| a.separation.total_cmp(&b.separation));
        return;
    }

    let mut kept: Vec<usize> = Vec::with_capacity(MAX_CONTACT_POINTS);
    if let Some(deepest) = pick_max(candidates.as_slice(), &kept, &|c| -c.separation) {
        kept.push(deepest);
    }
    let p0 = candidates[kept[0]].point_b;
    if let Some(far) = pick_max(candidates.as_slice(), &kept, &|c| c.point_b.distance_squared(p0)) {
        kept.push(far);
    }
    let p1 = candidates[kept[1]].point_b;
    let signed_area = |p: Vec3| (p1 - p0).cross(p - p0).dot(normal);
    if let Some(third) = pick_max(candidates.as_slice(), &kept, &|c| signed_area(c.point_b).abs()) {
        kept.push(third);
    }
    let side = signed_area(candidates[kept[2]].point_b).signum();
    if let Some(fourth) = pick_max(candidates.as_slice(), &kept, &|c| -side * signed_area(c.point_b)) {
        kept.push(fourth);
    }

    let reduced: Vec<ContactCandidate> = kept.iter().map(|&i| candidates[i]).collect();
    *candidates = reduced;
}

fn pick_max(
    candidates: &[ContactCandidate],
    used: &[usize],
    score: &dyn Fn(&ContactCandidate) -> f32,
) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .max_by(|(_, a), (_, b)| score(a).total_cmp(&score(b)))
        .map(|(i, _)| i)
}
