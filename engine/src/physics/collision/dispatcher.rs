//! Narrowphase dispatch: turns a broadphase pair into a contact manifold.

use glam::Vec3;

use super::clipping::clip_features;
use super::epa::epa;
use super::gjk::{ConvexProxy, GjkResult, gjk_distance};
use super::manifold::{ContactCandidate, ContactManifold, ContactPoint, reduce_candidates};
use crate::physics::body::{BodyHandle, PhysicsBody};

/// Closest-feature query result between two cores.
struct CoreContact {
    /// Unit axis from A toward B.
    normal: Vec3,
    /// Signed core gap along `normal` (negative when cores overlap).
    gap: f32,
    point_a: Vec3,
    point_b: Vec3,
}

/// Builds manifolds for body pairs whose surfaces are closer than the
/// contact breaking threshold.
#[derive(Debug, Clone, Copy)]
pub struct CollisionDispatcher {
    contact_breaking_threshold: f32,
}

impl CollisionDispatcher {
    pub fn new(contact_breaking_threshold: f32) -> Self {
        Self {
            contact_breaking_threshold,
        }
    }

    pub fn contact_breaking_threshold(&self) -> f32 {
        self.contact_breaking_threshold
    }

    /// Bodies interact unless both are static or neither is awake.
    pub fn needs_collision(&self, a: &PhysicsBody, b: &PhysicsBody) -> bool {
        a.is_awake_dynamic() || b.is_awake_dynamic()
    }

    fn core_contact(a: &ConvexProxy<'_>, b: &ConvexProxy<'_>) -> CoreContact {
        match gjk_distance(a, b) {
            GjkResult::Separated {
                distance,
                point_a,
                point_b,
            } => CoreContact {
                normal: ((point_b - point_a) / distance).normalize_or(Vec3::Y),
                gap: distance,
                point_a,
                point_b,
            },
            GjkResult::Overlapping(simplex) => match epa(&simplex, a, b) {
                Some(result) => CoreContact {
                    normal: result.normal,
                    gap: -result.depth,
                    point_a: result.point_a,
                    point_b: result.point_b,
                },
                None => {
                    // Touching or degenerate simplex: separate along the centre line.
                    let normal = (b.transform.position - a.transform.position).normalize_or(Vec3::Y);
                    let point_a = a.core_support(normal);
                    let point_b = b.core_support(-normal);
                    CoreContact {
                        normal,
                        gap: point_b.dot(normal) - point_a.dot(normal),
                        point_a,
                        point_b,
                    }
                }
            },
        }
    }

    /// Contact manifold for `(handle_a, a)` against `(handle_b, b)`, or
    /// `None` when their surfaces are farther apart than the breaking
    /// threshold.
    pub fn generate_manifold(
        &self,
        handle_a: BodyHandle,
        a: &PhysicsBody,
        handle_b: BodyHandle,
        b: &PhysicsBody,
    ) -> Option<ContactManifold> {
        let transform_a = a.transform();
        let transform_b = b.transform();
        let proxy_a = ConvexProxy::new(a.shape(), &transform_a);
        let proxy_b = ConvexProxy::new(b.shape(), &transform_b);
        let margin_a = proxy_a.inflation();
        let margin_b = proxy_b.inflation();

        let core = Self::core_contact(&proxy_a, &proxy_b);
        if core.gap - margin_a - margin_b >= self.contact_breaking_threshold {
            return None;
        }
        let n = core.normal;

        let mut candidates = clip_features(&proxy_a, &proxy_b, n);
        candidates.retain(|c| c.separation < self.contact_breaking_threshold);
        if candidates.is_empty() {
            candidates.push(ContactCandidate {
                point_a: core.point_a + n * margin_a,
                point_b: core.point_b - n * margin_b,
                separation: core.gap - margin_a - margin_b,
            });
        }
        reduce_candidates(&mut candidates, n);

        let mut manifold = ContactManifold::new(handle_a, handle_b);
        for candidate in candidates {
            let mut point = ContactPoint::new(candidate.point_b, -n, candidate.separation);
            point.position_world_on_a = candidate.point_a;
            manifold.add_point(point);
        }
        Some(manifold)
    }
}
