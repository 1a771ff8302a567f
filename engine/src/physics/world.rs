//! Physics world
//!
//! Owns every body, the broadphase, the narrowphase dispatcher and the
//! contact solver, and advances them with fixed sub-steps.
//!
//! # Stepping
//!
//! `step(dt, max_sub_steps)` accumulates `dt` and runs
//! `floor(accumulated / fixed_time_step)` sub-steps (at most
//! `max_sub_steps`; leftover time beyond that is dropped). With
//! `max_sub_steps == 0` a single variable step of `dt` runs instead.
//! Each sub-step:
//!
//! 1. apply gravity to awake dynamic bodies
//! 2. update world AABBs and find broadphase pairs
//! 3. build contact manifolds
//! 4. solve contacts
//! 5. integrate transforms
//! 6. deactivation bookkeeping
//!
//! The manifold list always reflects the last sub-step that ran.
//!
//! # Lifecycle
//!
//! Only one world may be alive per simulation thread. Dropping the world (or
//! calling [`PhysicsWorld::teardown`]) releases the slot.

use std::cell::Cell;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::body::{ActivationState, BodyHandle, PhysicsBody};
use super::collision::{CollisionDispatcher, ContactManifold, SweepAndPrune};
use super::error::WorldReentryError;
use super::solver::{SequentialImpulseSolver, SolverBody, SolverConfig};
use super::types::Transform;

/// Default fixed sub-step length (seconds).
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// Default sub-step cap per `step` call.
pub const DEFAULT_MAX_SUB_STEPS: u32 = 10;

thread_local! {
    static WORLD_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// World tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Downward gravitational acceleration (m/s²); the world uses `(0, -gravity, 0)`.
    pub gravity: f32,
    pub fixed_time_step: f32,
    pub max_sub_steps: u32,
    pub solver_iterations: usize,
    /// Surfaces closer than this produce contact points (meters).
    pub contact_breaking_threshold: f32,
    pub baumgarte: f32,
    pub penetration_slop: f32,
    pub linear_sleep_threshold: f32,
    pub angular_sleep_threshold: f32,
    /// Seconds below both thresholds before a body sleeps.
    pub deactivation_time: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: 7.8,
            fixed_time_step: FIXED_TIMESTEP,
            max_sub_steps: DEFAULT_MAX_SUB_STEPS,
            solver_iterations: 10,
            contact_breaking_threshold: 0.02,
            baumgarte: 0.2,
            penetration_slop: 0.01,
            linear_sleep_threshold: 0.8,
            angular_sleep_threshold: 1.0,
            deactivation_time: 2.0,
        }
    }
}

#[derive(Debug)]
struct BodySlot {
    generation: u32,
    body: Option<PhysicsBody>,
}

/// The simulation.
#[derive(Debug)]
pub struct PhysicsWorld {
    config: WorldConfig,
    gravity: Vec3,
    slots: Vec<BodySlot>,
    free_slots: Vec<u32>,
    /// Slots emptied since the last step; reusable once the next step starts.
    pending_free: Vec<u32>,
    broad_phase: SweepAndPrune,
    dispatcher: CollisionDispatcher,
    solver: SequentialImpulseSolver,
    solver_bodies: Vec<SolverBody>,
    manifolds: Vec<ContactManifold>,
    local_time: f32,
}

impl PhysicsWorld {
    /// Create the world with default tuning and the given gravity magnitude.
    ///
    /// # Errors
    /// [`WorldReentryError`] if another world is alive on this thread.
    pub fn initialize(gravity: f32) -> Result<Self, WorldReentryError> {
        Self::with_config(WorldConfig {
            gravity,
            ..WorldConfig::default()
        })
    }

    /// Create the world from a full configuration.
    pub fn with_config(config: WorldConfig) -> Result<Self, WorldReentryError> {
        WORLD_ACTIVE.with(|active| {
            if active.get() {
                Err(WorldReentryError)
            } else {
                active.set(true);
                Ok(())
            }
        })?;

        log::info!(
            "Physics world initialized (gravity {:.2}, fixed step {:.4}s, {} solver iterations)",
            config.gravity,
            config.fixed_time_step,
            config.solver_iterations
        );

        Ok(Self {
            config,
            gravity: Vec3::new(0.0, -config.gravity, 0.0),
            slots: Vec::new(),
            free_slots: Vec::new(),
            pending_free: Vec::new(),
            broad_phase: SweepAndPrune::new(),
            dispatcher: CollisionDispatcher::new(config.contact_breaking_threshold),
            solver: SequentialImpulseSolver::new(SolverConfig {
                iterations: config.solver_iterations,
                baumgarte: config.baumgarte,
                penetration_slop: config.penetration_slop,
            }),
            solver_bodies: Vec::new(),
            manifolds: Vec::new(),
            local_time: 0.0,
        })
    }

    /// Destroy the world, releasing the per-thread slot.
    pub fn teardown(self) {
        drop(self);
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Register a body and return its handle.
    pub fn add_body(&mut self, body: PhysicsBody) -> BodyHandle {
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(BodySlot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle::new(index, 0)
    }

    /// Remove a body.
    ///
    /// The body stops existing for the simulation immediately: it has no
    /// motion state and takes part in no contacts. Its slot is reused only
    /// after the next `step` begins. Returns `None` for stale handles.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<PhysicsBody> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.pending_free.push(handle.index() as u32);
        self.manifolds
            .retain(|m| m.body0() != handle && m.body1() != handle);
        Some(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&PhysicsBody> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut PhysicsBody> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.body.as_mut())
    }

    /// Current world transform of a live body.
    pub fn motion_state(&self, handle: BodyHandle) -> Option<Transform> {
        self.body(handle).map(PhysicsBody::transform)
    }

    pub fn body_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.body.is_some()).count()
    }

    /// Handles of every live body, in slot order.
    pub fn handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.body
                .as_ref()
                .map(|_| BodyHandle::new(i as u32, slot.generation))
        })
    }

    /// Contact manifolds of the last executed sub-step.
    pub fn manifolds(&self) -> std::slice::Iter<'_, ContactManifold> {
        self.manifolds.iter()
    }

    pub fn num_manifolds(&self) -> usize {
        self.manifolds.len()
    }

    /// Advance the simulation by `delta_time` seconds.
    pub fn step(&mut self, delta_time: f32, max_sub_steps: u32) {
        self.free_slots.append(&mut self.pending_free);

        let (sub_steps, step_dt) = if max_sub_steps == 0 {
            (u32::from(delta_time > 0.0), delta_time)
        } else {
            let fixed = self.config.fixed_time_step;
            self.local_time += delta_time.max(0.0);
            let available = (self.local_time / fixed).floor() as u32;
            self.local_time -= available as f32 * fixed;
            (available.min(max_sub_steps), fixed)
        };

        if sub_steps == 0 {
            self.manifolds.clear();
            return;
        }
        for _ in 0..sub_steps {
            self.single_step(step_dt);
        }
    }

    fn single_step(&mut self, dt: f32) {
        self.apply_gravity(dt);
        self.collide();
        self.solve_contacts(dt);
        self.integrate(dt);
        self.update_activation(dt);
    }

    fn apply_gravity(&mut self, dt: f32) {
        let dv = self.gravity * dt;
        for body in self.slots.iter_mut().filter_map(|s| s.body.as_mut()) {
            if let Some(dynamic) = body.as_dynamic_mut()
                && !dynamic.is_sleeping()
            {
                dynamic.linear_velocity += dv;
            }
        }
    }

    fn collide(&mut self) {
        let threshold = self.dispatcher.contact_breaking_threshold();
        self.broad_phase.clear();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(body) = &slot.body {
                let aabb = body.shape().world_aabb(&body.transform()).expanded(threshold);
                self.broad_phase.insert(i, aabb);
            }
        }
        let pairs = self.broad_phase.compute_pairs().to_vec();

        self.manifolds.clear();
        let mut to_wake: Vec<usize> = Vec::new();
        for (i, j) in pairs {
            let (Some(a), Some(b)) = (self.slots[i].body.as_ref(), self.slots[j].body.as_ref())
            else {
                continue;
            };
            if !self.dispatcher.needs_collision(a, b) {
                continue;
            }
            let ha = BodyHandle::new(i as u32, self.slots[i].generation);
            let hb = BodyHandle::new(j as u32, self.slots[j].generation);
            if let Some(manifold) = self.dispatcher.generate_manifold(ha, a, hb, b) {
                if !a.is_awake_dynamic() {
                    to_wake.push(i);
                }
                if !b.is_awake_dynamic() {
                    to_wake.push(j);
                }
                self.manifolds.push(manifold);
            }
        }
        for i in to_wake {
            if let Some(dynamic) = self.slots[i].body.as_mut().and_then(PhysicsBody::as_dynamic_mut) {
                dynamic.wake();
            }
        }
    }

    fn solve_contacts(&mut self, dt: f32) {
        self.solver_bodies.clear();
        for slot in &self.slots {
            let solver_body = match &slot.body {
                Some(PhysicsBody::Dynamic(body)) if !body.is_sleeping() => SolverBody {
                    center: body.core.transform.position,
                    inverse_mass: body.inverse_mass,
                    inverse_inertia: body.inverse_inertia_world(),
                    linear_velocity: body.linear_velocity,
                    angular_velocity: body.angular_velocity,
                    friction: body.core.friction,
                },
                Some(body) => SolverBody::fixed(body.transform().position, body.friction()),
                None => SolverBody::fixed(Vec3::ZERO, 0.0),
            };
            self.solver_bodies.push(solver_body);
        }

        self.solver
            .solve(&mut self.solver_bodies, &mut self.manifolds, dt);

        for (slot, solved) in self.slots.iter_mut().zip(&self.solver_bodies) {
            if let Some(dynamic) = slot.body.as_mut().and_then(PhysicsBody::as_dynamic_mut)
                && !dynamic.is_sleeping()
            {
                dynamic.linear_velocity = solved.linear_velocity;
                dynamic.angular_velocity = solved.angular_velocity;
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.slots.iter_mut().filter_map(|s| s.body.as_mut()) {
            let Some(dynamic) = body.as_dynamic_mut() else {
                continue;
            };
            if dynamic.is_sleeping() {
                continue;
            }
            let transform = &mut dynamic.core.transform;
            transform.position += dynamic.linear_velocity * dt;

            let w = dynamic.angular_velocity;
            if w.length_squared() > 0.0 {
                let q = transform.orientation;
                let spin = Quat::from_xyzw(w.x, w.y, w.z, 0.0) * q;
                let updated = Quat::from_xyzw(
                    q.x + 0.5 * dt * spin.x,
                    q.y + 0.5 * dt * spin.y,
                    q.z + 0.5 * dt * spin.z,
                    q.w + 0.5 * dt * spin.w,
                );
                transform.orientation = updated.normalize();
            }
        }
    }

    fn update_activation(&mut self, dt: f32) {
        let linear2 = self.config.linear_sleep_threshold * self.config.linear_sleep_threshold;
        let angular2 = self.config.angular_sleep_threshold * self.config.angular_sleep_threshold;
        let limit = self.config.deactivation_time;
        for body in self.slots.iter_mut().filter_map(|s| s.body.as_mut()) {
            let Some(dynamic) = body.as_dynamic_mut() else {
                continue;
            };
            if dynamic.activation != ActivationState::Active {
                continue;
            }
            if dynamic.linear_velocity.length_squared() < linear2
                && dynamic.angular_velocity.length_squared() < angular2
            {
                dynamic.sleep_timer += dt;
                if dynamic.sleep_timer > limit {
                    dynamic.activation = ActivationState::Sleeping;
                    dynamic.linear_velocity = Vec3::ZERO;
                    dynamic.angular_velocity = Vec3::ZERO;
                }
            } else {
                dynamic.sleep_timer = 0.0;
            }
        }
    }
}

impl Drop for PhysicsWorld {
    fn drop(&mut self) {
        WORLD_ACTIVE.with(|active| active.set(false));
        log::debug!("Physics world torn down ({} bodies)", self.body_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shape::CollisionShape;

    fn sphere_body(mass: f32, position: Vec3) -> PhysicsBody {
        PhysicsBody::new(
            CollisionShape::sphere(0.5).unwrap(),
            mass,
            Transform::from_position(position),
        )
        .unwrap()
    }

    #[test]
    fn test_second_world_rejected() {
        let world = PhysicsWorld::initialize(7.8).unwrap();
        assert_eq!(PhysicsWorld::initialize(7.8).unwrap_err(), WorldReentryError);
        world.teardown();
        let again = PhysicsWorld::initialize(7.8);
        assert!(again.is_ok());
    }

    #[test]
    fn test_gravity_vector() {
        let world = PhysicsWorld::initialize(7.8).unwrap();
        assert_eq!(world.gravity(), Vec3::new(0.0, -7.8, 0.0));
    }

    #[test]
    fn test_fixed_sub_steps() {
        let mut world = PhysicsWorld::initialize(10.0).unwrap();
        let h = world.add_body(sphere_body(1.0, Vec3::ZERO));

        // Half a fixed step: nothing runs yet.
        world.step(FIXED_TIMESTEP * 0.5, 10);
        assert_eq!(world.motion_state(h).unwrap().position, Vec3::ZERO);

        // The accumulated remainder completes one sub-step.
        world.step(FIXED_TIMESTEP * 0.5, 10);
        let v = world.body(h).unwrap().linear_velocity();
        assert!((v.y + 10.0 * FIXED_TIMESTEP).abs() < 1e-4);
    }

    #[test]
    fn test_sub_step_cap_drops_excess_time() {
        let mut world = PhysicsWorld::initialize(10.0).unwrap();
        let h = world.add_body(sphere_body(1.0, Vec3::ZERO));
        world.step(1.0, 2);
        let v = world.body(h).unwrap().linear_velocity();
        assert!((v.y + 20.0 * FIXED_TIMESTEP).abs() < 1e-4);
    }

    #[test]
    fn test_variable_step_when_no_sub_steps() {
        let mut world = PhysicsWorld::initialize(10.0).unwrap();
        let h = world.add_body(sphere_body(1.0, Vec3::ZERO));
        world.step(0.1, 0);
        let v = world.body(h).unwrap().linear_velocity();
        assert!((v.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_removed_body_has_no_motion_state() {
        let mut world = PhysicsWorld::initialize(0.0).unwrap();
        let a = world.add_body(sphere_body(1.0, Vec3::ZERO));
        assert!(world.remove_body(a).is_some());
        assert!(world.motion_state(a).is_none());
        assert!(world.remove_body(a).is_none());

        // The slot is not reused before the next step.
        let b = world.add_body(sphere_body(1.0, Vec3::X));
        assert_ne!(a.index(), b.index());

        world.step(FIXED_TIMESTEP, 1);
        let c = world.add_body(sphere_body(1.0, Vec3::Y));
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(world.motion_state(a).is_none());
        assert!(world.contains(c));
    }

    #[test]
    fn test_sleeping_body_wakes_on_contact() {
        let mut world = PhysicsWorld::initialize(0.0).unwrap();
        let resting = world.add_body(sphere_body(1.0, Vec3::ZERO));
        for _ in 0..150 {
            world.step(FIXED_TIMESTEP, 1);
        }
        assert!(world.body(resting).unwrap().as_dynamic().unwrap().is_sleeping());

        world.add_body(
            sphere_body(1.0, Vec3::new(-3.0, 0.0, 0.0)).with_linear_velocity(Vec3::new(20.0, 0.0, 0.0)),
        );
        for _ in 0..30 {
            world.step(FIXED_TIMESTEP, 1);
        }
        let body = world.body(resting).unwrap();
        assert!(!body.as_dynamic().unwrap().is_sleeping());
        assert!(body.linear_velocity().x > 0.0);
    }
}
