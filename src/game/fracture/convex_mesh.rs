//! Convex triangle meshes and plane cuts.
//!
//! [`ConvexMesh::from_points`] runs an incremental 3D hull over a point
//! cloud. Triangles wind counter-clockwise seen from outside.

use glam::Vec3;

use crate::physics::{Aabb, InvalidShapeError};

/// Closed convex polyhedron.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, Copy)]
struct HullFace {
    v: [usize; 3],
    normal: Vec3,
    offset: f32,
}

impl HullFace {
    fn new(points: &[Vec3], v: [usize; 3]) -> Self {
        let [a, b, c] = v.map(|i| points[i]);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        Self {
            v,
            normal,
            offset: normal.dot(a),
        }
    }

    fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

fn farthest_by(points: &[Vec3], score: impl Fn(Vec3) -> f32) -> (usize, f32) {
    points
        .iter()
        .enumerate()
        .map(|(i, &p)| (i, score(p)))
        .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best })
}

impl ConvexMesh {
    /// Convex hull of `points`.
    ///
    /// # Errors
    /// [`InvalidShapeError::EmptyGeometry`] without points,
    /// [`InvalidShapeError::DegenerateHull`] when the points are (nearly)
    /// coplanar.
    pub fn from_points(points: &[Vec3]) -> Result<Self, InvalidShapeError> {
        if points.is_empty() {
            return Err(InvalidShapeError::EmptyGeometry);
        }
        if points.len() < 4 {
            return Err(InvalidShapeError::DegenerateHull);
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(InvalidShapeError::NonFinite(index * 3));
        }

        let bounds = Aabb::from_points(points);
        let scale = (bounds.max - bounds.min).length();
        let eps = (scale * 1e-5).max(1e-7);

        // Initial tetrahedron from extreme points.
        let (i0, _) = farthest_by(points, |p| -p.x);
        let (i1, d1) = farthest_by(points, |p| (p - points[i0]).length());
        if d1 <= eps {
            return Err(InvalidShapeError::DegenerateHull);
        }
        let axis = (points[i1] - points[i0]).normalize();
        let (i2, d2) = farthest_by(points, |p| {
            let rel = p - points[i0];
            (rel - axis * rel.dot(axis)).length()
        });
        if d2 <= eps {
            return Err(InvalidShapeError::DegenerateHull);
        }
        let base = HullFace::new(points, [i0, i1, i2]);
        let (i3, d3) = farthest_by(points, |p| base.distance(p).abs());
        if d3 <= eps {
            return Err(InvalidShapeError::DegenerateHull);
        }

        let mut faces = if base.distance(points[i3]) > 0.0 {
            vec![
                HullFace::new(points, [i0, i2, i1]),
                HullFace::new(points, [i0, i1, i3]),
                HullFace::new(points, [i1, i2, i3]),
                HullFace::new(points, [i2, i0, i3]),
            ]
        } else {
            vec![
                HullFace::new(points, [i0, i1, i2]),
                HullFace::new(points, [i0, i3, i1]),
                HullFace::new(points, [i1, i3, i2]),
                HullFace::new(points, [i2, i3, i0]),
            ]
        };

        let seed = [i0, i1, i2, i3];
        let mut horizon: Vec<(usize, usize)> = Vec::new();
        for (index, &p) in points.iter().enumerate() {
            if seed.contains(&index) {
                continue;
            }
            let visible: Vec<bool> = faces.iter().map(|f| f.distance(p) > eps).collect();
            if !visible.contains(&true) {
                continue;
            }

            horizon.clear();
            for (face, _) in faces.iter().zip(&visible).filter(|(_, v)| **v) {
                for (a, b) in face.edges() {
                    let shared = faces
                        .iter()
                        .zip(&visible)
                        .any(|(other, v)| *v && other.edges().contains(&(b, a)));
                    if !shared {
                        horizon.push((a, b));
                    }
                }
            }

            let mut keep = visible.iter().map(|v| !v);
            faces.retain(|_| keep.next().unwrap_or(true));
            faces.extend(horizon.iter().map(|&(a, b)| HullFace::new(points, [a, b, index])));
        }

        // Keep only vertices referenced by the hull.
        let mut remap = vec![u32::MAX; points.len()];
        let mut vertices = Vec::new();
        let mut triangles = Vec::with_capacity(faces.len());
        for face in &faces {
            let mut tri = [0u32; 3];
            for (slot, &v) in tri.iter_mut().zip(&face.v) {
                if remap[v] == u32::MAX {
                    remap[v] = vertices.len() as u32;
                    vertices.push(points[v]);
                }
                *slot = remap[v];
            }
            triangles.push(tri);
        }
        Ok(Self { vertices, triangles })
    }

    /// Hull of a flat `x, y, z` coordinate buffer.
    pub fn from_flat_positions(coords: &[f32]) -> Result<Self, InvalidShapeError> {
        if coords.is_empty() {
            return Err(InvalidShapeError::EmptyGeometry);
        }
        let triples: &[[f32; 3]] = bytemuck::try_cast_slice(coords)
            .map_err(|_| InvalidShapeError::RaggedCoordinates(coords.len()))?;
        let points: Vec<Vec3> = triples.iter().map(|&t| Vec3::from_array(t)).collect();
        Self::from_points(&points)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn volume(&self) -> f32 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.vertices[i as usize]);
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    /// Centre of mass of the solid, assuming uniform density.
    pub fn centroid(&self) -> Vec3 {
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for t in &self.triangles {
            let [a, b, c] = t.map(|i| self.vertices[i as usize]);
            let volume = a.dot(b.cross(c)) / 6.0;
            weighted += (a + b + c) * (volume / 4.0);
            total += volume;
        }
        if total.abs() > f32::EPSILON {
            weighted / total
        } else {
            self.vertices.iter().copied().sum::<Vec3>() / self.vertices.len().max(1) as f32
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Largest distance from `center` to a vertex.
    pub fn bounding_radius(&self, center: Vec3) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.distance(center))
            .fold(0.0, f32::max)
    }

    /// Copy with every vertex shifted by `offset`.
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            vertices: self.vertices.iter().map(|&v| v + offset).collect(),
            triangles: self.triangles.clone(),
        }
    }

    pub fn flat_positions(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.to_array()).collect()
    }

    pub fn indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Split the mesh by the plane through `point` with `normal`.
    ///
    /// Returns the pieces on the positive and negative side. Vertices within
    /// `tolerance` of the plane belong to both; edges crossing the plane add
    /// their intersection point to both. A side with too few points to form
    /// a solid yields `None`.
    pub fn cut_by_plane(
        &self,
        normal: Vec3,
        point: Vec3,
        tolerance: f32,
    ) -> (Option<ConvexMesh>, Option<ConvexMesh>) {
        let distances: Vec<f32> = self.vertices.iter().map(|&v| normal.dot(v - point)).collect();
        let mut positive = Vec::with_capacity(self.vertices.len());
        let mut negative = Vec::with_capacity(self.vertices.len());

        for (&v, &d) in self.vertices.iter().zip(&distances) {
            if d.abs() <= tolerance {
                positive.push(v);
                negative.push(v);
            } else if d > 0.0 {
                positive.push(v);
            } else {
                negative.push(v);
            }
        }

        let mut edges: Vec<(u32, u32)> = self
            .triangles
            .iter()
            .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        edges.sort_unstable();
        edges.dedup();

        for (a, b) in edges {
            let (da, db) = (distances[a as usize], distances[b as usize]);
            if da.abs() <= tolerance || db.abs() <= tolerance || (da > 0.0) == (db > 0.0) {
                continue;
            }
            let t = da / (da - db);
            let va = self.vertices[a as usize];
            let vb = self.vertices[b as usize];
            let crossing = va + (vb - va) * t;
            positive.push(crossing);
            negative.push(crossing);
        }

        let build = |side: Vec<Vec3>| {
            if side.len() > 4 {
                ConvexMesh::from_points(&side).ok()
            } else {
                None
            }
        };
        (build(positive), build(negative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube(half: f32) -> ConvexMesh {
        let mut points = Vec::new();
        for &x in &[-half, half] {
            for &y in &[-half, half] {
                for &z in &[-half, half] {
                    points.push(Vec3::new(x, y, z));
                }
            }
        }
        ConvexMesh::from_points(&points).unwrap()
    }

    #[test]
    fn test_cube_hull() {
        let mesh = cube(1.0);
        assert_eq!(mesh.vertices().len(), 8);
        assert_eq!(mesh.triangles().len(), 12);
        assert_relative_eq!(mesh.volume(), 8.0, epsilon = 1e-4);
        assert!(mesh.centroid().length() < 1e-5);
    }

    #[test]
    fn test_interior_and_duplicate_points_dropped() {
        let mut points = cube(2.0).vertices().to_vec();
        points.push(Vec3::ZERO);
        points.push(Vec3::new(0.5, -0.3, 1.0));
        points.extend_from_slice(&cube(2.0).vertices()[..3]);
        let mesh = ConvexMesh::from_points(&points).unwrap();
        assert_eq!(mesh.vertices().len(), 8);
        assert_relative_eq!(mesh.volume(), 64.0, epsilon = 1e-3);
    }

    #[test]
    fn test_outward_winding() {
        let mesh = cube(1.0);
        let center = mesh.centroid();
        for t in mesh.triangles() {
            let [a, b, c] = t.map(|i| mesh.vertices()[i as usize]);
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a - center) > 0.0);
        }
    }

    #[test]
    fn test_flat_points_rejected() {
        let points = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        assert_eq!(
            ConvexMesh::from_points(&points).unwrap_err(),
            InvalidShapeError::DegenerateHull
        );
        assert_eq!(
            ConvexMesh::from_points(&[]).unwrap_err(),
            InvalidShapeError::EmptyGeometry
        );
    }

    #[test]
    fn test_cut_through_center_halves_volume() {
        let mesh = cube(2.0);
        let (pos, neg) = mesh.cut_by_plane(Vec3::X, Vec3::ZERO, 1e-4);
        let (pos, neg) = (pos.unwrap(), neg.unwrap());
        assert_relative_eq!(pos.volume(), 32.0, epsilon = 1e-3);
        assert_relative_eq!(neg.volume(), 32.0, epsilon = 1e-3);
        assert_relative_eq!(pos.centroid().x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(neg.centroid().x, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_cut_missing_mesh_is_one_sided() {
        let mesh = cube(1.0);
        let (pos, neg) = mesh.cut_by_plane(Vec3::Y, Vec3::new(0.0, 5.0, 0.0), 1e-4);
        assert!(pos.is_none());
        assert_relative_eq!(neg.unwrap().volume(), 8.0, epsilon = 1e-4);
    }

    #[test]
    fn test_flat_positions_and_indices() {
        let mesh = cube(1.0);
        assert_eq!(mesh.flat_positions().len(), 24);
        let indices = mesh.indices();
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| i < 8));
    }
}
