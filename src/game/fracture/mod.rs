//! Fracture Module
//!
//! Convex polyhedra, plane cuts and impact subdivision of breakable objects.

pub mod convex_mesh;
pub mod engine;

pub use convex_mesh::ConvexMesh;
pub use engine::{BreakableObject, DebrisFragment, FractureEngine};
