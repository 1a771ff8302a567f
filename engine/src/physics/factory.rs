//! Rigid body construction
//!
//! [`RigidBodyFactory`] turns a [`RigidBodyDesc`] into a registered body:
//! inertia from the shape, the shared friction constant, deactivation
//! disabled for dynamic bodies, and registration with both the world and a
//! transform-sync registry.

use glam::{Quat, Vec3};

use super::body::{ActivationState, BodyHandle, ObjectId, PhysicsBody};
use super::error::InvalidShapeError;
use super::shape::CollisionShape;
use super::types::Transform;
use super::world::PhysicsWorld;

/// Default surface friction for every body.
pub const DEFAULT_FRICTION: f32 = 0.5;

/// Receives dynamic bodies that need transform sync.
pub trait BodyRegistrar {
    /// Start tracking `handle`; returns `false` if the body is not eligible.
    fn register(&mut self, world: &PhysicsWorld, handle: BodyHandle) -> bool;
}

/// Everything needed to build one rigid body.
#[derive(Debug, Clone)]
pub struct RigidBodyDesc {
    pub shape: CollisionShape,
    pub mass: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Option<Vec3>,
    pub angular_velocity: Option<Vec3>,
    pub render_handle: Option<ObjectId>,
    pub breakable: bool,
}

impl RigidBodyDesc {
    pub fn new(shape: CollisionShape, mass: f32) -> Self {
        Self {
            shape,
            mass,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: None,
            angular_velocity: None,
            render_handle: None,
            breakable: false,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = Some(velocity);
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        self.angular_velocity = Some(velocity);
        self
    }

    pub fn with_render_handle(mut self, handle: ObjectId) -> Self {
        self.render_handle = Some(handle);
        self
    }

    pub fn with_breakable(mut self, breakable: bool) -> Self {
        self.breakable = breakable;
        self
    }
}

/// Builds and registers rigid bodies.
#[derive(Debug, Clone, Copy)]
pub struct RigidBodyFactory {
    friction: f32,
}

impl Default for RigidBodyFactory {
    fn default() -> Self {
        Self::new(DEFAULT_FRICTION)
    }
}

impl RigidBodyFactory {
    pub fn new(friction: f32) -> Self {
        Self { friction }
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Build the body described by `desc` and add it to `world`.
    ///
    /// Dynamic bodies never deactivate and are handed to `registry`.
    ///
    /// # Errors
    /// [`InvalidShapeError`] for negative/non-finite mass or a non-finite
    /// transform. Nothing is added to the world in that case.
    pub fn create_rigid_body<R: BodyRegistrar + ?Sized>(
        &self,
        world: &mut PhysicsWorld,
        registry: &mut R,
        desc: RigidBodyDesc,
    ) -> Result<BodyHandle, InvalidShapeError> {
        if !desc.position.is_finite() || !desc.orientation.is_finite() {
            return Err(InvalidShapeError::InvalidDimensions);
        }
        let transform = Transform::new(desc.position, desc.orientation);
        let mut body = PhysicsBody::new(desc.shape, desc.mass, transform)?
            .with_friction(self.friction)
            .with_breakable(desc.breakable)
            .with_render_handle(desc.render_handle);
        if let Some(velocity) = desc.linear_velocity {
            body = body.with_linear_velocity(velocity);
        }
        if let Some(velocity) = desc.angular_velocity {
            body = body.with_angular_velocity(velocity);
        }

        let dynamic = body.is_dynamic();
        if dynamic {
            body = body.with_activation_state(ActivationState::DisableDeactivation);
        }
        let handle = world.add_body(body);
        if dynamic {
            registry.register(world, handle);
        }
        Ok(handle)
    }
}
