//! Collision detection
//!
//! - [`broad_phase`] - sweep-and-prune over world AABBs
//! - [`gjk`] / [`epa`] - distance and penetration between shape cores
//! - [`clipping`] - multi-point contacts from facing features
//! - [`dispatcher`] - pair to [`ContactManifold`]

pub mod broad_phase;
pub mod clipping;
pub mod dispatcher;
pub mod epa;
pub mod gjk;
pub mod manifold;

pub use broad_phase::SweepAndPrune;
pub use dispatcher::CollisionDispatcher;
pub use epa::{EpaResult, epa};
pub use gjk::{ConvexProxy, GjkResult, gjk_distance};
pub use manifold::{ContactManifold, ContactPoint, MAX_CONTACT_POINTS};
