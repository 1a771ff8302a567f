//! GJK distance query between shape cores.
//!
//! Works on the Minkowski difference `A - B` of the two un-inflated cores.
//! The closest point of the current simplex to the origin is found by
//! sub-simplex search (Voronoi regions), and its barycentric weights give the
//! witness points on each core.

use glam::Vec3;

use crate::physics::shape::CollisionShape;
use crate::physics::types::Transform;

const GJK_MAX_ITERATIONS: usize = 64;

/// Relative convergence tolerance on the squared distance.
const GJK_RELATIVE_TOLERANCE: f32 = 1e-6;

/// Squared distance below which the cores count as overlapping.
const GJK_OVERLAP_EPSILON: f32 = 1e-10;

/// A shape placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct ConvexProxy<'a> {
    pub shape: &'a CollisionShape,
    pub transform: &'a Transform,
}

impl<'a> ConvexProxy<'a> {
    pub fn new(shape: &'a CollisionShape, transform: &'a Transform) -> Self {
        Self { shape, transform }
    }

    /// World-space core support point along a world-space direction.
    #[inline]
    pub fn core_support(&self, direction: Vec3) -> Vec3 {
        let local_dir = self.transform.inverse_transform_vector(direction);
        self.transform
            .transform_point(self.shape.core_support(local_dir))
    }

    /// Extent of the core along `direction`.
    #[inline]
    pub fn core_extent(&self, direction: Vec3) -> f32 {
        self.core_support(direction).dot(direction)
    }

    pub fn inflation(&self) -> f32 {
        self.shape.inflation()
    }
}

/// Vertex of the Minkowski difference with its source points.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportPoint {
    /// `a - b`
    pub point: Vec3,
    pub a: Vec3,
    pub b: Vec3,
}

/// Support point of `A - B` along `direction`.
pub fn minkowski_support(a: &ConvexProxy<'_>, b: &ConvexProxy<'_>, direction: Vec3) -> SupportPoint {
    let sa = a.core_support(direction);
    let sb = b.core_support(-direction);
    SupportPoint {
        point: sa - sb,
        a: sa,
        b: sb,
    }
}

#[derive(Debug, Clone, Copy)]
struct Barycentric {
    indices: [usize; 3],
    weights: [f32; 3],
    count: usize,
}

impl Barycentric {
    fn vertex(i: usize) -> Self {
        Self {
            indices: [i, 0, 0],
            weights: [1.0, 0.0, 0.0],
            count: 1,
        }
    }

    fn edge(i: usize, j: usize, t: f32) -> Self {
        Self {
            indices: [i, j, 0],
            weights: [1.0 - t, t, 0.0],
            count: 2,
        }
    }

    fn face(i: usize, j: usize, k: usize, v: f32, w: f32) -> Self {
        Self {
            indices: [i, j, k],
            weights: [1.0 - v - w, v, w],
            count: 3,
        }
    }
}

/// Up to four Minkowski vertices plus the barycentric weights of the
/// closest point found by the last [`Simplex::closest_to_origin`] call.
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    vertices: [SupportPoint; 4],
    weights: [f32; 4],
    len: usize,
}

impl Simplex {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn vertices(&self) -> &[SupportPoint] {
        &self.vertices[..self.len]
    }

    pub fn push(&mut self, vertex: SupportPoint) {
        if self.len < 4 {
            self.vertices[self.len] = vertex;
            self.weights[self.len] = 0.0;
            self.len += 1;
        }
    }

    fn contains(&self, point: Vec3) -> bool {
        self.vertices()
            .iter()
            .any(|v| v.point.distance_squared(point) < 1e-12)
    }

    /// Witness points on A and B for the current closest point.
    pub fn witness_points(&self) -> (Vec3, Vec3) {
        let mut pa = Vec3::ZERO;
        let mut pb = Vec3::ZERO;
        for (vertex, &w) in self.vertices().iter().zip(&self.weights) {
            pa += vertex.a * w;
            pb += vertex.b * w;
        }
        (pa, pb)
    }

    /// Reduce to the sub-simplex supporting the point closest to the origin
    /// and return that point, or `None` when a tetrahedron contains the origin.
    pub fn closest_to_origin(&mut self) -> Option<Vec3> {
        let (point, bary) = match self.len {
            0 => return Some(Vec3::ZERO),
            1 => (self.vertices[0].point, Barycentric::vertex(0)),
            2 => segment_closest(&self.vertices, 0, 1),
            3 => triangle_closest(&self.vertices, 0, 1, 2),
            _ => tetrahedron_closest(&self.vertices)?,
        };
        self.reduce(bary);
        Some(point)
    }

    fn reduce(&mut self, bary: Barycentric) {
        let old = self.vertices;
        for slot in 0..bary.count {
            self.vertices[slot] = old[bary.indices[slot]];
            self.weights[slot] = bary.weights[slot];
        }
        self.len = bary.count;
    }
}

fn segment_closest(v: &[SupportPoint; 4], i: usize, j: usize) -> (Vec3, Barycentric) {
    let a = v[i].point;
    let ab = v[j].point - a;
    let denom = ab.length_squared();
    let t = if denom > f32::EPSILON {
        -a.dot(ab) / denom
    } else {
        0.0
    };
    if t <= 0.0 {
        (a, Barycentric::vertex(i))
    } else if t >= 1.0 {
        (v[j].point, Barycentric::vertex(j))
    } else {
        (a + ab * t, Barycentric::edge(i, j, t))
    }
}

/// Closest point of triangle `(i, j, k)` to the origin (Ericson, RTCD 5.1.5).
fn triangle_closest(v: &[SupportPoint; 4], i: usize, j: usize, k: usize) -> (Vec3, Barycentric) {
    let a = v[i].point;
    let b = v[j].point;
    let c = v[k].point;
    let ab = b - a;
    let ac = c - a;

    let ap = -a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, Barycentric::vertex(i));
    }

    let bp = -b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, Barycentric::vertex(j));
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        return (a + ab * t, Barycentric::edge(i, j, t));
    }

    let cp = -c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, Barycentric::vertex(k));
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        return (a + ac * t, Barycentric::edge(i, k, t));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * t, Barycentric::edge(j, k, t));
    }

    let sum = va + vb + vc;
    if sum.abs() < f32::MIN_POSITIVE {
        return (a, Barycentric::vertex(i));
    }
    let denom = 1.0 / sum;
    let vw = vb * denom;
    let ww = vc * denom;
    (a + ab * vw + ac * ww, Barycentric::face(i, j, k, vw, ww))
}

fn tetrahedron_closest(v: &[SupportPoint; 4]) -> Option<(Vec3, Barycentric)> {
    const FACES: [[usize; 4]; 4] = [[0, 1, 2, 3], [0, 1, 3, 2], [0, 2, 3, 1], [1, 2, 3, 0]];

    let mut best: Option<(Vec3, Barycentric)> = None;
    for [i, j, k, opposite] in FACES {
        let a = v[i].point;
        let normal = (v[j].point - a).cross(v[k].point - a);
        let side_origin = (-a).dot(normal);
        let side_opposite = (v[opposite].point - a).dot(normal);
        let outside = side_opposite.abs() < 1e-12 || side_origin * side_opposite < 0.0;
        if !outside {
            continue;
        }
        let candidate = triangle_closest(v, i, j, k);
        let better = best
            .as_ref()
            .is_none_or(|(p, _)| candidate.0.length_squared() < p.length_squared());
        if better {
            best = Some(candidate);
        }
    }
    best
}

/// Outcome of a GJK query.
#[derive(Debug, Clone)]
pub enum GjkResult {
    /// Cores are disjoint; witness points lie on the cores.
    Separated {
        distance: f32,
        point_a: Vec3,
        point_b: Vec3,
    },
    /// Cores overlap. The simplex seeds EPA when it is a full tetrahedron.
    Overlapping(Simplex),
}

/// Distance between the cores of two shapes.
pub fn gjk_distance(a: &ConvexProxy<'_>, b: &ConvexProxy<'_>) -> GjkResult {
    let mut direction = a.transform.position - b.transform.position;
    if direction.length_squared() < f32::EPSILON {
        direction = Vec3::X;
    }

    let mut simplex = Simplex::default();
    simplex.push(minkowski_support(a, b, direction));

    let mut iterations = 0;
    loop {
        let Some(v) = simplex.closest_to_origin() else {
            return GjkResult::Overlapping(simplex);
        };
        let dist2 = v.length_squared();
        if dist2 <= GJK_OVERLAP_EPSILON {
            return GjkResult::Overlapping(simplex);
        }

        iterations += 1;
        let w = minkowski_support(a, b, -v);
        let converged = dist2 - v.dot(w.point) <= GJK_RELATIVE_TOLERANCE * dist2;
        if converged || iterations >= GJK_MAX_ITERATIONS || simplex.contains(w.point) {
            let (point_a, point_b) = simplex.witness_points();
            return GjkResult::Separated {
                distance: dist2.sqrt(),
                point_a,
                point_b,
            };
        }
        simplex.push(w);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_separated_spheres() {
        let s = CollisionShape::sphere(1.0).unwrap();
        let ta = Transform::from_position(Vec3::ZERO);
        let tb = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));
        match gjk_distance(&ConvexProxy::new(&s, &ta), &ConvexProxy::new(&s, &tb)) {
            GjkResult::Separated {
                distance,
                point_a,
                point_b,
            } => {
                // Cores are the centres.
                assert_relative_eq!(distance, 5.0, epsilon = 1e-5);
                assert_relative_eq!(point_a.x, 0.0, epsilon = 1e-5);
                assert_relative_eq!(point_b.x, 5.0, epsilon = 1e-5);
            }
            GjkResult::Overlapping(_) => panic!("expected separation"),
        }
    }

    #[test]
    fn test_sphere_above_box_face() {
        let ground = CollisionShape::cuboid(Vec3::new(5.0, 0.5, 5.0), 0.05).unwrap();
        let ball = CollisionShape::sphere(0.4).unwrap();
        let tg = Transform::IDENTITY;
        let tb = Transform::from_position(Vec3::new(0.3, 2.0, -0.2));
        match gjk_distance(&ConvexProxy::new(&ball, &tb), &ConvexProxy::new(&ground, &tg)) {
            GjkResult::Separated {
                distance, point_b, ..
            } => {
                // Ground core top is at 0.45.
                assert_relative_eq!(distance, 1.55, epsilon = 1e-4);
                assert_relative_eq!(point_b.y, 0.45, epsilon = 1e-4);
            }
            GjkResult::Overlapping(_) => panic!("expected separation"),
        }
    }

    #[test]
    fn test_overlapping_boxes() {
        let cube = CollisionShape::cuboid(Vec3::ONE, 0.0).unwrap();
        let ta = Transform::IDENTITY;
        let tb = Transform::from_position(Vec3::new(1.5, 0.2, 0.1));
        let result = gjk_distance(&ConvexProxy::new(&cube, &ta), &ConvexProxy::new(&cube, &tb));
        assert!(matches!(result, GjkResult::Overlapping(_)));
    }

    #[test]
    fn test_triangle_closest_interior() {
        let mut s = Simplex::default();
        for p in [
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ] {
            s.push(SupportPoint { point: p, a: p, b: Vec3::ZERO });
        }
        let closest = s.closest_to_origin().unwrap();
        assert_relative_eq!(closest.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(closest.x, 0.0, epsilon = 1e-6);
        assert_eq!(s.len(), 3);
    }
}
