//! Shatterbox Engine Library
//!
//! Destructible rigid-body physics: projectiles are launched into breakable
//! convex objects, contacts are evaluated after every world step, and bodies
//! hit hard enough are split into fragments that keep the parent's momentum.
//!
//! # Modules
//!
//! - [`physics`] - Rigid bodies, collision detection, contact solver and the world
//! - [`game`] - Fracture, collision processing, scene registry and scene orchestration
//!
//! # Example
//!
//! ```ignore
//! use shatterbox_engine::game::{DestructionScene, SimulationConfig};
//! use glam::Vec3;
//!
//! let mut scene = DestructionScene::reference_scene(SimulationConfig::default())?;
//! scene.fire(Vec3::new(0.0, 10.0, -20.0), Vec3::Z)?;
//! for _ in 0..120 {
//!     scene.tick(1.0 / 60.0)?;
//!     for event in scene.drain_events() {
//!         // hand transforms and lifecycle events to the renderer
//!     }
//! }
//! ```

pub mod physics;

// Game-specific modules (located in src/game/ directory)
#[path = "../../src/game/mod.rs"]
pub mod game;

pub use game::{DestructionScene, SceneEvent, SimulationConfig, SimulationError};
pub use physics::{BodyHandle, ObjectId, PhysicsWorld};
