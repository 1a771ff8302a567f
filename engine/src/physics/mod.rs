//! Physics module
//!
//! Rigid-body simulation built on glam, without an external physics engine.
//!
//! # Unit System
//!
//! **1 unit = 1 meter** (SI units throughout)
//!
//! - Distances in meters
//! - Velocities in m/s
//! - Accelerations in m/s²
//! - Mass in kg
//! - Impulses in N·s
//!
//! # Submodules
//!
//! - [`types`] - Core mathematical types (Vec3, Quat) re-exported from glam, plus Transform and Aabb
//! - [`shape`] - Collision shapes (sphere, cuboid, convex hull) with margins and inertia
//! - [`hull`] - Convex hull shapes built from flat vertex buffers
//! - [`body`] - Static and dynamic rigid bodies
//! - [`collision`] - Broadphase, GJK/EPA narrowphase and contact manifolds
//! - [`solver`] - Sequential impulse contact solver
//! - [`world`] - The simulation world and its stepping
//! - [`factory`] - Rigid body construction and registration
//! - [`projectile`] - Projectile spawn requests

pub mod body;
pub mod collision;
pub mod error;
pub mod factory;
pub mod hull;
pub mod projectile;
pub mod shape;
pub mod solver;
pub mod types;
pub mod world;

// Re-export commonly used types at the physics module level
pub use body::{ActivationState, BodyFlags, BodyHandle, DynamicBody, ObjectId, PhysicsBody, StaticBody};
pub use collision::{ContactManifold, ContactPoint};
pub use error::{InvalidShapeError, WorldReentryError};
pub use factory::{BodyRegistrar, DEFAULT_FRICTION, RigidBodyDesc, RigidBodyFactory};
pub use hull::{ConvexHullBuilder, ConvexHullShape};
pub use projectile::{ProjectileConfig, SpawnRequest};
pub use shape::{CollisionShape, DEFAULT_COLLISION_MARGIN};
pub use types::{Aabb, Quat, Transform, Vec3};
pub use world::{DEFAULT_MAX_SUB_STEPS, FIXED_TIMESTEP, PhysicsWorld, WorldConfig};
