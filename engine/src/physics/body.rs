//! Rigid bodies
//!
//! A [`PhysicsBody`] is either [`StaticBody`] (mass 0, never integrated) or
//! [`DynamicBody`] (mass > 0). Both share a [`BodyCore`] carrying the shape,
//! the world transform and the user flags. Bodies refer to their renderable by
//! [`ObjectId`] only; the physics layer never owns render state.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::error::InvalidShapeError;
use super::shape::CollisionShape;
use super::types::Transform;

/// Identifier of a renderable object in the external scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generational handle to a body slot in a [`PhysicsWorld`](super::PhysicsWorld).
///
/// A handle whose slot was freed and reused never resolves to the new body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub(super) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "body {}v{}", self.index, self.generation)
    }
}

/// Per-body user flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyFlags {
    /// Body carries fracture metadata and may be subdivided.
    pub breakable: bool,
    /// Body already fractured during the current collision pass.
    pub collided: bool,
}

/// Sleep state of a dynamic body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationState {
    #[default]
    Active,
    Sleeping,
    /// Never falls asleep.
    DisableDeactivation,
}

/// State shared by static and dynamic bodies.
#[derive(Debug, Clone)]
pub struct BodyCore {
    pub(super) shape: CollisionShape,
    pub(super) transform: Transform,
    pub(super) friction: f32,
    pub(super) flags: BodyFlags,
    pub(super) render_handle: Option<ObjectId>,
}

/// Immovable body (ground, walls).
#[derive(Debug, Clone)]
pub struct StaticBody {
    pub(super) core: BodyCore,
}

/// Simulated body with mass and velocity.
#[derive(Debug, Clone)]
pub struct DynamicBody {
    pub(super) core: BodyCore,
    pub(super) mass: f32,
    pub(super) inverse_mass: f32,
    pub(super) local_inertia: Vec3,
    pub(super) inverse_inertia_local: Vec3,
    pub(super) linear_velocity: Vec3,
    pub(super) angular_velocity: Vec3,
    pub(super) activation: ActivationState,
    pub(super) sleep_timer: f32,
}

impl DynamicBody {
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn local_inertia(&self) -> Vec3 {
        self.local_inertia
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    pub fn is_sleeping(&self) -> bool {
        self.activation == ActivationState::Sleeping
    }

    /// Inverse inertia tensor rotated into world space.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let r = self.core.transform.basis();
        r * Mat3::from_diagonal(self.inverse_inertia_local) * r.transpose()
    }

    pub(super) fn wake(&mut self) {
        if self.activation == ActivationState::Sleeping {
            self.activation = ActivationState::Active;
        }
        self.sleep_timer = 0.0;
    }
}

/// A rigid body: static or dynamic.
#[derive(Debug, Clone)]
pub enum PhysicsBody {
    Static(StaticBody),
    Dynamic(DynamicBody),
}

impl PhysicsBody {
    /// Build a body from a shape and mass.
    ///
    /// `mass == 0` yields a static body, `mass > 0` a dynamic one whose
    /// inertia is computed from the shape.
    ///
    /// # Errors
    /// [`InvalidShapeError::InvalidMass`] for negative or non-finite mass.
    pub fn new(
        shape: CollisionShape,
        mass: f32,
        transform: Transform,
    ) -> Result<Self, InvalidShapeError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(InvalidShapeError::InvalidMass(mass));
        }
        let core = BodyCore {
            shape,
            transform,
            friction: 0.5,
            flags: BodyFlags::default(),
            render_handle: None,
        };
        if mass == 0.0 {
            return Ok(PhysicsBody::Static(StaticBody { core }));
        }

        let local_inertia = core.shape.calculate_local_inertia(mass);
        let invert = |v: f32| if v > 0.0 { 1.0 / v } else { 0.0 };
        Ok(PhysicsBody::Dynamic(DynamicBody {
            core,
            mass,
            inverse_mass: 1.0 / mass,
            local_inertia,
            inverse_inertia_local: Vec3::new(
                invert(local_inertia.x),
                invert(local_inertia.y),
                invert(local_inertia.z),
            ),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            activation: ActivationState::Active,
            sleep_timer: 0.0,
        }))
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.core_mut().friction = friction;
        self
    }

    pub fn with_render_handle(mut self, handle: Option<ObjectId>) -> Self {
        self.core_mut().render_handle = handle;
        self
    }

    pub fn with_breakable(mut self, breakable: bool) -> Self {
        self.core_mut().flags.breakable = breakable;
        self
    }

    /// Initial linear velocity; ignored for static bodies.
    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        if let PhysicsBody::Dynamic(body) = &mut self {
            body.linear_velocity = velocity;
        }
        self
    }

    /// Initial angular velocity; ignored for static bodies.
    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        if let PhysicsBody::Dynamic(body) = &mut self {
            body.angular_velocity = velocity;
        }
        self
    }

    /// Activation state; ignored for static bodies.
    pub fn with_activation_state(mut self, state: ActivationState) -> Self {
        if let PhysicsBody::Dynamic(body) = &mut self {
            body.activation = state;
        }
        self
    }

    fn core(&self) -> &BodyCore {
        match self {
            PhysicsBody::Static(body) => &body.core,
            PhysicsBody::Dynamic(body) => &body.core,
        }
    }

    fn core_mut(&mut self) -> &mut BodyCore {
        match self {
            PhysicsBody::Static(body) => &mut body.core,
            PhysicsBody::Dynamic(body) => &mut body.core,
        }
    }

    pub fn shape(&self) -> &CollisionShape {
        &self.core().shape
    }

    pub fn transform(&self) -> Transform {
        self.core().transform
    }

    pub fn friction(&self) -> f32 {
        self.core().friction
    }

    pub fn flags(&self) -> BodyFlags {
        self.core().flags
    }

    pub fn is_breakable(&self) -> bool {
        self.core().flags.breakable
    }

    pub fn is_collided(&self) -> bool {
        self.core().flags.collided
    }

    pub fn set_collided(&mut self, collided: bool) {
        self.core_mut().flags.collided = collided;
    }

    pub fn set_breakable(&mut self, breakable: bool) {
        self.core_mut().flags.breakable = breakable;
    }

    pub fn render_handle(&self) -> Option<ObjectId> {
        self.core().render_handle
    }

    /// 0 for static bodies.
    pub fn mass(&self) -> f32 {
        match self {
            PhysicsBody::Static(_) => 0.0,
            PhysicsBody::Dynamic(body) => body.mass,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, PhysicsBody::Static(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, PhysicsBody::Dynamic(_))
    }

    pub fn linear_velocity(&self) -> Vec3 {
        match self {
            PhysicsBody::Static(_) => Vec3::ZERO,
            PhysicsBody::Dynamic(body) => body.linear_velocity,
        }
    }

    pub fn angular_velocity(&self) -> Vec3 {
        match self {
            PhysicsBody::Static(_) => Vec3::ZERO,
            PhysicsBody::Dynamic(body) => body.angular_velocity,
        }
    }

    pub fn as_dynamic(&self) -> Option<&DynamicBody> {
        match self {
            PhysicsBody::Dynamic(body) => Some(body),
            PhysicsBody::Static(_) => None,
        }
    }

    pub(super) fn as_dynamic_mut(&mut self) -> Option<&mut DynamicBody> {
        match self {
            PhysicsBody::Dynamic(body) => Some(body),
            PhysicsBody::Static(_) => None,
        }
    }

    /// Awake dynamic bodies drive contacts; static and sleeping ones do not.
    pub(super) fn is_awake_dynamic(&self) -> bool {
        matches!(self, PhysicsBody::Dynamic(body) if !body.is_sleeping())
    }
}
