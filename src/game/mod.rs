//! Game Module
//!
//! Destruction systems that build on top of the physics engine: render-facing
//! types, configuration, fracture, the per-tick systems and the scene that
//! wires them together.

pub mod config;
pub mod fracture;
pub mod scenes;
pub mod systems;
pub mod types;

pub use config::{ConfigError, SimulationConfig};
pub use fracture::{BreakableObject, ConvexMesh, DebrisFragment, FractureEngine};
pub use scenes::{DestructionScene, SimulationError};
pub use systems::{
    CollisionProcessor, ProcessorState, RemovalQueue, RemovalQueueOverflow, SceneObjectRegistry,
};
pub use types::{
    GeometryDescriptor, InstanceTransform, MeshDescriptor, ObjectIdAllocator, SceneEvent,
};
