//! Impact-driven subdivision of breakable convex objects.

use std::f32::consts::PI;

use glam::{Quat, Vec3};

use super::convex_mesh::ConvexMesh;
use crate::game::config::FractureConfig;
use crate::game::types::GeometryDescriptor;
use crate::physics::{CollisionShape, ConvexHullBuilder, InvalidShapeError, Transform};

/// Fracture metadata of one breakable body.
#[derive(Debug, Clone)]
pub struct BreakableObject {
    /// Convex polyhedron in object space.
    pub mesh: ConvexMesh,
    /// Vertex buffer the object was prepared from (flat `x, y, z`).
    pub positions: Vec<f32>,
    pub mass: f32,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub breakable: bool,
    /// World transform at the last sync.
    pub transform: Transform,
}

impl BreakableObject {
    /// Render geometry of the object's hull.
    pub fn geometry(&self) -> GeometryDescriptor {
        GeometryDescriptor::new(self.mesh.flat_positions(), self.mesh.indices())
    }
}

/// One piece produced by [`FractureEngine::subdivide_by_impact`].
#[derive(Debug, Clone)]
pub struct DebrisFragment {
    /// Fragment metadata; `mesh` is centred on the fragment's centroid and
    /// `transform` places it in the world.
    pub object: BreakableObject,
    /// Share of the parent's volume (and mass).
    pub mass_fraction: f32,
    pub shape: CollisionShape,
    pub geometry: GeometryDescriptor,
}

/// Splits breakable objects along planes through the impact point.
#[derive(Debug, Clone)]
pub struct FractureEngine {
    config: FractureConfig,
    hull_builder: ConvexHullBuilder,
}

impl FractureEngine {
    pub fn new(config: FractureConfig, hull_builder: ConvexHullBuilder) -> Self {
        Self {
            config,
            hull_builder,
        }
    }

    pub fn config(&self) -> &FractureConfig {
        &self.config
    }

    /// Build fracture metadata for a vertex buffer.
    ///
    /// `velocity` and `angular_velocity` are the initial velocities the
    /// object will be created with.
    pub fn prepare_breakable(
        &self,
        positions: &[f32],
        mass: f32,
        velocity: Vec3,
        angular_velocity: Vec3,
        breakable: bool,
    ) -> Result<BreakableObject, InvalidShapeError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(InvalidShapeError::InvalidMass(mass));
        }
        let mesh = ConvexMesh::from_flat_positions(positions)?;
        Ok(BreakableObject {
            mesh,
            positions: positions.to_vec(),
            mass,
            velocity,
            angular_velocity,
            breakable,
            transform: Transform::IDENTITY,
        })
    }

    /// Cut `object` into at most `cuts_per_level` fragments.
    ///
    /// Level 0 cuts along the plane spanned by the impact normal and the
    /// direction from the impact point to the object's centre; each further
    /// level rotates that plane about the impact normal by
    /// `π / (max_cut_depth + 1)`. A plane that misses a piece leaves it
    /// whole, so at least one fragment is always returned unless no piece
    /// yields a valid hull.
    pub fn subdivide_by_impact(
        &self,
        object: &BreakableObject,
        impact_point: Vec3,
        impact_normal: Vec3,
        max_cut_depth: u32,
        cuts_per_level: u32,
    ) -> Vec<DebrisFragment> {
        let cap = cuts_per_level.max(1) as usize;
        let local_point = object.transform.inverse_transform_point(impact_point);
        let axis = object
            .transform
            .inverse_transform_vector(impact_normal)
            .try_normalize()
            .unwrap_or(Vec3::Y);
        let to_center = (object.mesh.centroid() - local_point).normalize_or_zero();
        let spread = axis.cross(to_center);
        let base_normal = if spread.length() > 1e-3 {
            spread.normalize()
        } else {
            axis.any_orthonormal_vector()
        };

        let mut pieces = vec![object.mesh.clone()];
        for level in 0..=max_cut_depth {
            if pieces.len() >= cap {
                break;
            }
            let angle = level as f32 * PI / (max_cut_depth as f32 + 1.0);
            let normal = Quat::from_axis_angle(axis, angle) * base_normal;

            let mut next = Vec::with_capacity(cap);
            let mut remaining = pieces.len();
            for piece in pieces {
                remaining -= 1;
                if next.len() + remaining + 2 > cap {
                    next.push(piece);
                    continue;
                }
                match piece.cut_by_plane(normal, local_point, self.config.coplanar_tolerance) {
                    (Some(front), Some(back)) => {
                        next.push(front);
                        next.push(back);
                    }
                    _ => next.push(piece),
                }
            }
            pieces = next;
        }

        self.build_fragments(object, pieces)
    }

    fn build_fragments(&self, parent: &BreakableObject, pieces: Vec<ConvexMesh>) -> Vec<DebrisFragment> {
        let mut built = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let centroid = piece.centroid();
            let local = piece.translated(-centroid);
            let positions = local.flat_positions();
            match self.hull_builder.build_from_positions(&positions) {
                Ok(shape) => built.push((local, positions, centroid, shape)),
                Err(e) => log::warn!("Dropping fragment without a valid hull: {}", e),
            }
        }

        let volumes: Vec<f32> = built.iter().map(|(mesh, ..)| mesh.volume().max(0.0)).collect();
        let total: f32 = volumes.iter().sum();
        let count = built.len();

        built
            .into_iter()
            .zip(volumes)
            .map(|((mesh, positions, centroid, shape), volume)| {
                let mass_fraction = if total > 0.0 {
                    volume / total
                } else {
                    1.0 / count as f32
                };
                let size = 2.0 * mesh.bounding_radius(Vec3::ZERO);
                let geometry = GeometryDescriptor::new(positions.clone(), mesh.indices());
                DebrisFragment {
                    object: BreakableObject {
                        mesh,
                        positions,
                        mass: parent.mass * mass_fraction,
                        velocity: parent.velocity,
                        angular_velocity: parent.angular_velocity,
                        breakable: parent.breakable && size > self.config.min_fragment_size,
                        transform: Transform::new(
                            parent.transform.transform_point(centroid),
                            parent.transform.orientation,
                        ),
                    },
                    mass_fraction,
                    shape,
                    geometry,
                }
            })
            .collect()
    }
}
