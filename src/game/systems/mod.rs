//! Game systems: self-contained modules that own state and logic.

pub mod collision_system;
pub mod removal_queue;
pub mod scene_registry;

pub use collision_system::{CollisionProcessor, Impact, ProcessorState};
pub use removal_queue::{DEFAULT_REMOVAL_CAPACITY, RemovalQueue, RemovalQueueOverflow};
pub use scene_registry::SceneObjectRegistry;
