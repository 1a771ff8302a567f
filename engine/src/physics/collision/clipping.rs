//! Multi-point contacts by feature clipping.
//!
//! Given the separating axis `n` (A toward B), each core contributes the
//! points nearest the other body (its *feature*: a face, an edge or a vertex).
//! Both features are projected onto the plane orthogonal to `n`, intersected
//! in 2D, and every intersection vertex is lifted back onto each feature's
//! plane to measure the separation there.

use glam::{Vec2, Vec3};

use super::gjk::ConvexProxy;
use super::manifold::ContactCandidate;

/// Depth band (meters) within which core points belong to the same feature.
const FEATURE_TOLERANCE: f32 = 0.01;

const EPSILON_2D: f32 = 1e-6;

struct Feature {
    points: Vec<Vec3>,
    /// Indices into `points` of the projected 2D hull, counter-clockwise.
    hull: Vec<usize>,
    projected: Vec<Vec2>,
}

impl Feature {
    fn polygon(&self) -> Vec<Vec2> {
        self.hull.iter().map(|&i| self.projected[i]).collect()
    }

    /// Plane through the feature as `(normal, point)`, oriented along `n`.
    fn plane(&self, n: Vec3) -> (Vec3, Vec3) {
        let centroid = self.points.iter().copied().sum::<Vec3>() / self.points.len() as f32;
        let normal = match self.hull.len() {
            0 | 1 => n,
            2 => {
                let edge = (self.points[self.hull[1]] - self.points[self.hull[0]]).normalize_or_zero();
                (n - edge * n.dot(edge)).normalize_or(n)
            }
            _ => {
                // Newell's method over the ordered hull vertices.
                let mut newell = Vec3::ZERO;
                for (k, &i) in self.hull.iter().enumerate() {
                    let cur = self.points[i];
                    let next = self.points[self.hull[(k + 1) % self.hull.len()]];
                    newell.x += (cur.y - next.y) * (cur.z + next.z);
                    newell.y += (cur.z - next.z) * (cur.x + next.x);
                    newell.z += (cur.x - next.x) * (cur.y + next.y);
                }
                newell.normalize_or(n)
            }
        };
        let normal = if normal.dot(n) < 0.0 { -normal } else { normal };
        if normal.dot(n) < 0.5 {
            (n, centroid)
        } else {
            (normal, centroid)
        }
    }

    /// Distance along `n` from the projection plane to the feature plane at `base`.
    fn height_at(&self, plane: (Vec3, Vec3), n: Vec3, base: Vec3) -> f32 {
        let (normal, point) = plane;
        normal.dot(point - base) / normal.dot(n)
    }
}

fn collect_feature(proxy: &ConvexProxy<'_>, direction: Vec3, u: Vec3, w: Vec3) -> Feature {
    let core = proxy.shape.core_points();
    let world: Vec<Vec3> = core
        .iter()
        .map(|&p| proxy.transform.transform_point(p))
        .collect();
    let extent = world
        .iter()
        .map(|p| p.dot(direction))
        .fold(f32::NEG_INFINITY, f32::max);
    let points: Vec<Vec3> = world
        .into_iter()
        .filter(|p| p.dot(direction) >= extent - FEATURE_TOLERANCE)
        .collect();
    let projected: Vec<Vec2> = points.iter().map(|p| Vec2::new(p.dot(u), p.dot(w))).collect();
    let hull = convex_hull_2d(&projected);
    Feature {
        points,
        hull,
        projected,
    }
}

/// Monotone-chain hull; returns indices in counter-clockwise order with
/// collinear and duplicate points removed.
pub(crate) fn convex_hull_2d(points: &[Vec2]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .x
            .total_cmp(&points[b].x)
            .then(points[a].y.total_cmp(&points[b].y))
    });
    order.dedup_by(|a, b| points[*a].distance_squared(points[*b]) < EPSILON_2D * EPSILON_2D);
    if order.len() < 3 {
        return order;
    }

    let cross = |o: Vec2, a: Vec2, b: Vec2| (a - o).perp_dot(b - o);
    let mut hull: Vec<usize> = Vec::with_capacity(order.len() * 2);
    for &i in &order {
        while hull.len() >= 2
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= EPSILON_2D
        {
            hull.pop();
        }
        hull.push(i);
    }
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= EPSILON_2D
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();
    if hull.len() == 2 && hull[0] == hull[1] {
        hull.pop();
    }
    hull
}

fn inside(edge_start: Vec2, edge_end: Vec2, p: Vec2) -> f32 {
    (edge_end - edge_start).perp_dot(p - edge_start)
}

/// Sutherland-Hodgman: clip `subject` against convex CCW `clip`.
pub(crate) fn clip_polygon(subject: &[Vec2], clip: &[Vec2]) -> Vec<Vec2> {
    let mut output = subject.to_vec();
    for k in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let c0 = clip[k];
        let c1 = clip[(k + 1) % clip.len()];
        let input = std::mem::take(&mut output);
        for i in 0..input.len() {
            let cur = input[i];
            let prev = input[(i + input.len() - 1) % input.len()];
            let d_cur = inside(c0, c1, cur);
            let d_prev = inside(c0, c1, prev);
            if d_cur >= -EPSILON_2D {
                if d_prev < -EPSILON_2D {
                    output.push(prev + (cur - prev) * (d_prev / (d_prev - d_cur)));
                }
                output.push(cur);
            } else if d_prev >= -EPSILON_2D {
                output.push(prev + (cur - prev) * (d_prev / (d_prev - d_cur)));
            }
        }
    }
    output
}

/// Part of segment `s0..s1` inside convex CCW `clip`.
pub(crate) fn clip_segment(s0: Vec2, s1: Vec2, clip: &[Vec2]) -> Vec<Vec2> {
    let mut t_lo = 0.0f32;
    let mut t_hi = 1.0f32;
    for k in 0..clip.len() {
        let c0 = clip[k];
        let c1 = clip[(k + 1) % clip.len()];
        let f0 = inside(c0, c1, s0);
        let f1 = inside(c0, c1, s1);
        if f0 < -EPSILON_2D && f1 < -EPSILON_2D {
            return Vec::new();
        }
        if f0 < -EPSILON_2D {
            t_lo = t_lo.max(f0 / (f0 - f1));
        } else if f1 < -EPSILON_2D {
            t_hi = t_hi.min(f0 / (f0 - f1));
        }
    }
    if t_lo > t_hi {
        return Vec::new();
    }
    vec![s0 + (s1 - s0) * t_lo, s0 + (s1 - s0) * t_hi]
}

/// Contact candidates between the facing features of `a` and `b`.
///
/// Returns an empty list when either feature is a single vertex or both are
/// edges; the caller then falls back to the closest-point contact.
pub(crate) fn clip_features(
    a: &ConvexProxy<'_>,
    b: &ConvexProxy<'_>,
    n: Vec3,
) -> Vec<ContactCandidate> {
    if a.shape.is_sphere() || b.shape.is_sphere() {
        return Vec::new();
    }
    let (u, w) = n.any_orthonormal_pair();
    let feature_a = collect_feature(a, n, u, w);
    let feature_b = collect_feature(b, -n, u, w);
    if feature_a.hull.len() < 2 || feature_b.hull.len() < 2 {
        return Vec::new();
    }

    let poly_a = feature_a.polygon();
    let poly_b = feature_b.polygon();
    let clipped = match (poly_a.len(), poly_b.len()) {
        (2, 2) => return Vec::new(),
        (2, _) => clip_segment(poly_a[0], poly_a[1], &poly_b),
        (_, 2) => clip_segment(poly_b[0], poly_b[1], &poly_a),
        _ => clip_polygon(&poly_a, &poly_b),
    };

    let plane_a = feature_a.plane(n);
    let plane_b = feature_b.plane(n);
    let margin_a = a.inflation();
    let margin_b = b.inflation();
    clipped
        .into_iter()
        .map(|q| {
            let base = u * q.x + w * q.y;
            let t_a = feature_a.height_at(plane_a, n, base);
            let t_b = feature_b.height_at(plane_b, n, base);
            ContactCandidate {
                point_a: base + n * (t_a + margin_a),
                point_b: base + n * (t_b - margin_b),
                separation: t_b - t_a - margin_a - margin_b,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shape::CollisionShape;
    use crate::physics::types::Transform;

    #[test]
    fn test_hull_2d_square_with_interior() {
        let pts = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.5, 0.0),
        ];
        let hull = convex_hull_2d(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&2));
        assert!(!hull.contains(&5));
    }

    #[test]
    fn test_clip_square_against_square() {
        let a = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let b = [
            Vec2::new(1.0, 1.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(1.0, 3.0),
        ];
        let out = clip_polygon(&a, &b);
        assert_eq!(out.len(), 4);
        for p in out {
            assert!(p.x >= 1.0 - 1e-5 && p.x <= 2.0 + 1e-5);
            assert!(p.y >= 1.0 - 1e-5 && p.y <= 2.0 + 1e-5);
        }
    }

    #[test]
    fn test_clip_segment_through_square() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let out = clip_segment(Vec2::new(-1.0, 0.5), Vec2::new(2.0, 0.5), &square);
        assert_eq!(out.len(), 2);
        assert!((out[0].x - 0.0).abs() < 1e-5);
        assert!((out[1].x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_box_resting_on_ground_gives_four_points() {
        let ground = CollisionShape::cuboid(Vec3::new(20.0, 0.5, 20.0), 0.05).unwrap();
        let crate_shape = CollisionShape::cuboid(Vec3::ONE, 0.05).unwrap();
        let tg = Transform::from_position(Vec3::new(0.0, -0.5, 0.0));
        let tc = Transform::from_position(Vec3::new(0.0, 0.98, 0.0));
        let cands = clip_features(
            &ConvexProxy::new(&crate_shape, &tc),
            &ConvexProxy::new(&ground, &tg),
            -Vec3::Y,
        );
        assert_eq!(cands.len(), 4);
        for c in cands {
            assert!((c.separation + 0.02).abs() < 1e-4);
        }
    }
}
