//! Expanding Polytope Algorithm for overlapping cores.

use glam::Vec3;

use super::gjk::{ConvexProxy, Simplex, SupportPoint, minkowski_support};

const EPA_MAX_ITERATIONS: usize = 64;
const EPA_TOLERANCE: f32 = 1e-4;
const EPA_MAX_FACES: usize = 256;

/// Penetration of the two cores.
#[derive(Debug, Clone, Copy)]
pub struct EpaResult {
    /// Unit normal pointing from A toward B.
    pub normal: Vec3,
    /// Overlap of the cores along `normal` (non-negative).
    pub depth: f32,
    /// Deepest core point of A.
    pub point_a: Vec3,
    /// Deepest core point of B.
    pub point_b: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

fn make_face(vertices: &[SupportPoint], indices: [usize; 3]) -> Option<Face> {
    let a = vertices[indices[0]].point;
    let b = vertices[indices[1]].point;
    let c = vertices[indices[2]].point;
    let normal = (b - a).cross(c - a);
    let len = normal.length();
    if len < 1e-10 {
        return None;
    }
    let normal = normal / len;
    let distance = normal.dot(a);
    // The origin is inside the polytope, so outward faces have distance >= 0.
    if distance < 0.0 {
        Some(Face {
            indices: [indices[0], indices[2], indices[1]],
            normal: -normal,
            distance: -distance,
        })
    } else {
        Some(Face {
            indices,
            normal,
            distance,
        })
    }
}

fn closest_face(faces: &[Face]) -> Option<Face> {
    faces
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .copied()
}

fn add_or_remove_edge(edges: &mut Vec<(usize, usize)>, edge: (usize, usize)) {
    if let Some(pos) = edges.iter().position(|e| *e == (edge.1, edge.0)) {
        edges.swap_remove(pos);
    } else {
        edges.push(edge);
    }
}

fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-12 {
        return Vec3::splat(1.0 / 3.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}

fn contact_from_face(vertices: &[SupportPoint], face: &Face) -> EpaResult {
    let [i, j, k] = face.indices;
    let bary = barycentric(
        face.normal * face.distance,
        vertices[i].point,
        vertices[j].point,
        vertices[k].point,
    );
    EpaResult {
        normal: face.normal,
        depth: face.distance.max(0.0),
        point_a: vertices[i].a * bary.x + vertices[j].a * bary.y + vertices[k].a * bary.z,
        point_b: vertices[i].b * bary.x + vertices[j].b * bary.y + vertices[k].b * bary.z,
    }
}

/// Penetration depth from a GJK simplex enclosing the origin.
///
/// Returns `None` unless the simplex is a non-degenerate tetrahedron.
pub fn epa(simplex: &Simplex, a: &ConvexProxy<'_>, b: &ConvexProxy<'_>) -> Option<EpaResult> {
    if simplex.len() < 4 {
        return None;
    }

    let mut vertices: Vec<SupportPoint> = simplex.vertices().to_vec();
    let mut faces: Vec<Face> = Vec::with_capacity(EPA_MAX_FACES);
    for indices in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
        faces.push(make_face(&vertices, indices)?);
    }

    let mut edges: Vec<(usize, usize)> = Vec::new();
    for _ in 0..EPA_MAX_ITERATIONS {
        let closest = closest_face(&faces)?;
        let support = minkowski_support(a, b, closest.normal);
        if support.point.dot(closest.normal) - closest.distance < EPA_TOLERANCE
            || faces.len() > EPA_MAX_FACES
        {
            return Some(contact_from_face(&vertices, &closest));
        }

        let new_index = vertices.len();
        vertices.push(support);

        edges.clear();
        faces.retain(|face| {
            let visible = face
                .normal
                .dot(support.point - vertices[face.indices[0]].point)
                > 0.0;
            if visible {
                for e in 0..3 {
                    add_or_remove_edge(&mut edges, (face.indices[e], face.indices[(e + 1) % 3]));
                }
            }
            !visible
        });

        for &(i, j) in &edges {
            if let Some(face) = make_face(&vertices, [i, j, new_index]) {
                faces.push(face);
            }
        }
    }

    let closest = closest_face(&faces)?;
    Some(contact_from_face(&vertices, &closest))
}
