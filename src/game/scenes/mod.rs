//! Scene Module
//!
//! High-level scene compositions that wire together all game systems.

pub mod destruction_scene;

pub use destruction_scene::{DestructionScene, SimulationError};
