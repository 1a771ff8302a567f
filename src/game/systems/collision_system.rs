//! Collision processor: turns contact manifolds into fractures.
//!
//! Runs once per tick after the world step and the transform sync. Each
//! manifold is tested against the fracture threshold; bodies that break are
//! replaced by debris created through the rigid body factory, and the broken
//! parents are removed at the end of the pass through a bounded
//! [`RemovalQueue`].

use std::collections::HashMap;

use glam::Vec3;

use super::removal_queue::{RemovalQueue, RemovalQueueOverflow};
use super::scene_registry::SceneObjectRegistry;
use crate::game::config::SimulationConfig;
use crate::game::fracture::{BreakableObject, FractureEngine};
use crate::game::types::{ObjectId, ObjectIdAllocator, SceneEvent};
use crate::physics::{
    BodyHandle, ContactManifold, ConvexHullBuilder, PhysicsWorld, RigidBodyDesc, RigidBodyFactory,
};

/// Phase of the current collision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessorState {
    #[default]
    Idle,
    ScanningManifolds,
    EvaluatingContact,
    Fracturing,
}

/// Strongest penetrating contact of a manifold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub impulse: f32,
    /// World-space contact position on body1.
    pub point: Vec3,
    /// Contact normal on body1.
    pub normal: Vec3,
}

impl Impact {
    /// Sample the manifold's first penetrating point.
    ///
    /// Only that point is considered; later points are ignored even when
    /// they carry a larger impulse. `None` when nothing penetrates or the
    /// sampled impulse is not positive.
    pub fn from_manifold(manifold: &ContactManifold) -> Option<Self> {
        manifold
            .points()
            .iter()
            .find(|point| point.distance < 0.0)
            .filter(|point| point.applied_impulse > 0.0)
            .map(|point| Impact {
                impulse: point.applied_impulse,
                point: point.position_world_on_b,
                normal: point.normal_world_on_b,
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct Side {
    handle: BodyHandle,
    object: Option<ObjectId>,
    breakable: bool,
    collided: bool,
}

/// Evaluates manifolds and fractures breakable bodies.
#[derive(Debug)]
pub struct CollisionProcessor {
    state: ProcessorState,
    engine: FractureEngine,
    factory: RigidBodyFactory,
    breakables: HashMap<BodyHandle, BreakableObject>,
    queue: RemovalQueue,
}

impl CollisionProcessor {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            state: ProcessorState::Idle,
            engine: FractureEngine::new(
                config.fracture,
                ConvexHullBuilder::new(config.body.collision_margin),
            ),
            factory: RigidBodyFactory::new(config.body.friction),
            breakables: HashMap::new(),
            queue: RemovalQueue::new(config.removal_queue_capacity),
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn engine(&self) -> &FractureEngine {
        &self.engine
    }

    pub fn queue(&self) -> &RemovalQueue {
        &self.queue
    }

    /// Attach fracture metadata to a body.
    pub fn track(&mut self, handle: BodyHandle, object: BreakableObject) {
        self.breakables.insert(handle, object);
    }

    pub fn breakable(&self, handle: BodyHandle) -> Option<&BreakableObject> {
        self.breakables.get(&handle)
    }

    pub fn breakable_count(&self) -> usize {
        self.breakables.len()
    }

    /// Drop metadata of a body removed outside a collision pass.
    pub fn forget(&mut self, handle: BodyHandle) -> Option<BreakableObject> {
        self.breakables.remove(&handle)
    }

    fn set_state(&mut self, next: ProcessorState) {
        if self.state != next {
            log::trace!("Collision processor {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn side(&self, world: &PhysicsWorld, handle: BodyHandle) -> Side {
        let body = world.body(handle);
        let object = body.and_then(|b| b.render_handle());
        let rendered = body.filter(|_| object.is_some());
        Side {
            handle,
            object,
            breakable: rendered.is_some_and(|b| b.is_breakable())
                && self.breakables.contains_key(&handle),
            collided: rendered.is_some_and(|b| b.is_collided()),
        }
    }

    /// Run one collision pass over `manifolds`.
    ///
    /// Returns the number of bodies fractured. The removal queue is flushed
    /// even when the pass stops early on overflow.
    ///
    /// # Errors
    /// [`RemovalQueueOverflow`] when a fracture was due but the queue was
    /// full; that fracture and every later manifold are skipped.
    pub fn process(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &mut SceneObjectRegistry,
        manifolds: &[ContactManifold],
        ids: &mut ObjectIdAllocator,
        events: &mut Vec<SceneEvent>,
    ) -> Result<usize, RemovalQueueOverflow> {
        let threshold = self.engine.config().fracture_impulse;
        let mut fractured = 0;
        let mut outcome = Ok(());

        'manifolds: for manifold in manifolds {
            self.set_state(ProcessorState::ScanningManifolds);
            let sides = [
                self.side(world, manifold.body0()),
                self.side(world, manifold.body1()),
            ];
            if sides.iter().all(|s| s.object.is_none()) {
                continue;
            }
            if sides.iter().all(|s| !s.breakable) || sides.iter().all(|s| s.collided) {
                continue;
            }

            self.set_state(ProcessorState::EvaluatingContact);
            let Some(impact) = Impact::from_manifold(manifold) else {
                continue;
            };

            for side in sides {
                if !side.breakable || side.collided || impact.impulse <= threshold {
                    continue;
                }
                self.set_state(ProcessorState::Fracturing);
                match self.fracture_body(world, registry, side.handle, &impact, ids, events) {
                    Ok(()) => fractured += 1,
                    Err(overflow) => {
                        log::error!(
                            "Fracture of {} skipped: {}; ending collision pass",
                            side.handle,
                            overflow
                        );
                        outcome = Err(overflow);
                        break 'manifolds;
                    }
                }
            }
        }

        self.flush(world, registry, events);
        self.set_state(ProcessorState::Idle);
        outcome.map(|()| fractured)
    }

    fn fracture_body(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &mut SceneObjectRegistry,
        handle: BodyHandle,
        impact: &Impact,
        ids: &mut ObjectIdAllocator,
        events: &mut Vec<SceneEvent>,
    ) -> Result<(), RemovalQueueOverflow> {
        if self.queue.is_full() {
            return Err(RemovalQueueOverflow {
                capacity: self.queue.capacity(),
            });
        }
        let (Some(body), Some(object)) = (world.body(handle), self.breakables.get_mut(&handle))
        else {
            return Ok(());
        };
        object.transform = body.transform();
        object.velocity = body.linear_velocity();
        object.angular_velocity = body.angular_velocity();

        let config = *self.engine.config();
        let fragments = self.engine.subdivide_by_impact(
            object,
            impact.point,
            impact.normal,
            config.max_cut_depth,
            config.cuts_per_level,
        );
        log::debug!(
            "Fracturing {} (impulse {:.1}) into {} fragments",
            handle,
            impact.impulse,
            fragments.len()
        );

        for fragment in fragments {
            let object_id = ids.next_id();
            let transform = fragment.object.transform;
            let desc = RigidBodyDesc::new(fragment.shape, fragment.object.mass)
                .with_position(transform.position)
                .with_orientation(transform.orientation)
                .with_linear_velocity(fragment.object.velocity)
                .with_angular_velocity(fragment.object.angular_velocity)
                .with_render_handle(object_id)
                .with_breakable(fragment.object.breakable);
            match self.factory.create_rigid_body(world, registry, desc) {
                Ok(fragment_handle) => {
                    events.push(SceneEvent::ObjectCreated {
                        object: object_id,
                        geometry: fragment.geometry,
                    });
                    self.breakables.insert(fragment_handle, fragment.object);
                }
                Err(e) => log::warn!("Skipping fragment of {}: {}", handle, e),
            }
        }

        self.queue.push(handle)?;
        if let Some(body) = world.body_mut(handle) {
            body.set_collided(true);
        }
        Ok(())
    }

    fn flush(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &mut SceneObjectRegistry,
        events: &mut Vec<SceneEvent>,
    ) {
        let breakables = &mut self.breakables;
        self.queue.drain_with(|handle| {
            let Some(body) = world.remove_body(handle) else {
                return;
            };
            registry.unregister(handle);
            breakables.remove(&handle);
            if let Some(object) = body.render_handle() {
                events.push(SceneEvent::ObjectDestroyed { object });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::GeometryDescriptor;
    use crate::physics::{CollisionShape, ContactPoint, Quat};
    use approx::assert_relative_eq;

    struct Rig {
        world: PhysicsWorld,
        registry: SceneObjectRegistry,
        processor: CollisionProcessor,
        ids: ObjectIdAllocator,
        events: Vec<SceneEvent>,
    }

    impl Rig {
        fn new(config: SimulationConfig) -> Self {
            Self {
                world: PhysicsWorld::initialize(0.0).unwrap(),
                registry: SceneObjectRegistry::new(),
                processor: CollisionProcessor::new(&config),
                ids: ObjectIdAllocator::new(),
                events: Vec::new(),
            }
        }

        fn breakable_box(&mut self, position: Vec3) -> BodyHandle {
            let geometry = GeometryDescriptor::from_box(Vec3::splat(2.0));
            let object = self
                .processor
                .engine()
                .prepare_breakable(&geometry.positions, 1000.0, Vec3::ZERO, Vec3::ZERO, true)
                .unwrap();
            let shape = ConvexHullBuilder::default()
                .build_from_positions(&geometry.positions)
                .unwrap();
            let desc = RigidBodyDesc::new(shape, 1000.0)
                .with_position(position)
                .with_orientation(Quat::IDENTITY)
                .with_render_handle(self.ids.next_id())
                .with_breakable(true);
            let handle = RigidBodyFactory::default()
                .create_rigid_body(&mut self.world, &mut self.registry, desc)
                .unwrap();
            self.processor.track(handle, object);
            handle
        }

        fn ball(&mut self, position: Vec3, rendered: bool) -> BodyHandle {
            let mut desc = RigidBodyDesc::new(CollisionShape::sphere(0.4).unwrap(), 35.0)
                .with_position(position);
            if rendered {
                desc = desc.with_render_handle(self.ids.next_id());
            }
            RigidBodyFactory::default()
                .create_rigid_body(&mut self.world, &mut self.registry, desc)
                .unwrap()
        }

        fn run(&mut self, manifolds: &[ContactManifold]) -> Result<usize, RemovalQueueOverflow> {
            self.processor.process(
                &mut self.world,
                &mut self.registry,
                manifolds,
                &mut self.ids,
                &mut self.events,
            )
        }
    }

    fn hit(ball: BodyHandle, target: BodyHandle, at: Vec3, impulse: f32) -> ContactManifold {
        ContactManifold::new(ball, target).with_point(
            ContactPoint::new(at, -Vec3::Z, -0.01).with_applied_impulse(impulse),
        )
    }

    #[test]
    fn test_sub_threshold_impulse_changes_nothing() {
        let mut rig = Rig::new(SimulationConfig::default());
        let target = rig.breakable_box(Vec3::new(0.0, 0.0, 10.0));
        let ball = rig.ball(Vec3::new(0.0, 0.0, 7.6), true);

        for impulse in [100.0, 250.0] {
            let fractured = rig.run(&[hit(ball, target, Vec3::new(0.0, 0.0, 8.0), impulse)]);
            assert_eq!(fractured, Ok(0));
        }
        assert!(rig.world.contains(target));
        assert!(!rig.world.body(target).unwrap().is_collided());
        assert!(rig.events.is_empty());
        assert_eq!(rig.processor.state(), ProcessorState::Idle);
    }

    #[test]
    fn test_strong_hit_replaces_body_with_debris() {
        let mut rig = Rig::new(SimulationConfig::default());
        let target = rig.breakable_box(Vec3::new(0.0, 0.0, 10.0));
        let target_id = rig.world.body(target).unwrap().render_handle().unwrap();
        let ball = rig.ball(Vec3::new(0.0, 0.0, 7.6), true);

        let fractured = rig.run(&[hit(ball, target, Vec3::new(0.0, 0.0, 8.0), 800.0)]);
        assert_eq!(fractured, Ok(1));
        assert!(!rig.world.contains(target));
        assert!(!rig.registry.contains(target));
        assert!(rig.processor.breakable(target).is_none());
        assert!(rig.processor.queue().is_empty());

        let created: Vec<ObjectId> = rig
            .events
            .iter()
            .filter(|e| matches!(e, SceneEvent::ObjectCreated { .. }))
            .map(SceneEvent::object)
            .collect();
        assert_eq!(created.len(), 2);
        assert_eq!(
            rig.events.last(),
            Some(&SceneEvent::ObjectDestroyed { object: target_id })
        );

        // Two fragments plus the ball remain registered.
        assert_eq!(rig.registry.len(), 3);
        assert_eq!(rig.processor.breakable_count(), 2);
        let mass: f32 = rig
            .registry
            .iter()
            .filter(|&h| h != ball)
            .map(|h| rig.world.body(h).unwrap().mass())
            .sum();
        assert_relative_eq!(mass, 1000.0, epsilon = 0.1);
    }

    #[test]
    fn test_latch_fractures_body_once_per_pass() {
        let mut rig = Rig::new(SimulationConfig::default());
        let target = rig.breakable_box(Vec3::new(0.0, 0.0, 10.0));
        let first = rig.ball(Vec3::new(0.0, 0.0, 7.6), true);
        let second = rig.ball(Vec3::new(0.0, 0.0, 12.4), true);

        let manifolds = [
            hit(first, target, Vec3::new(0.0, 0.0, 8.0), 600.0),
            hit(second, target, Vec3::new(0.0, 0.0, 12.0), 600.0),
        ];
        assert_eq!(rig.run(&manifolds), Ok(1));
        let destroyed = rig
            .events
            .iter()
            .filter(|e| matches!(e, SceneEvent::ObjectDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 1);
    }

    #[test]
    fn test_only_first_penetrating_point_is_sampled() {
        let mut rig = Rig::new(SimulationConfig::default());
        let target = rig.breakable_box(Vec3::new(0.0, 0.0, 10.0));
        let ball = rig.ball(Vec3::new(0.0, 0.0, 7.6), true);
        let manifold = ContactManifold::new(ball, target)
            .with_point(ContactPoint::new(Vec3::new(0.0, 0.0, 8.0), -Vec3::Z, 0.01).with_applied_impulse(900.0))
            .with_point(ContactPoint::new(Vec3::new(0.1, 0.0, 8.0), -Vec3::Z, -0.01).with_applied_impulse(10.0))
            .with_point(ContactPoint::new(Vec3::new(0.2, 0.0, 8.0), -Vec3::Z, -0.02).with_applied_impulse(900.0));
        assert_eq!(Impact::from_manifold(&manifold).map(|i| i.impulse), Some(10.0));
        assert_eq!(rig.run(&[manifold]), Ok(0));
        assert!(rig.world.contains(target));
    }

    #[test]
    fn test_unloaded_first_contact_yields_no_impact() {
        let mut rig = Rig::new(SimulationConfig::default());
        let target = rig.breakable_box(Vec3::new(0.0, 0.0, 10.0));
        let ball = rig.ball(Vec3::new(0.0, 0.0, 7.6), true);
        let manifold = ContactManifold::new(ball, target)
            .with_point(ContactPoint::new(Vec3::ZERO, -Vec3::Z, -0.03))
            .with_point(ContactPoint::new(Vec3::X, -Vec3::Z, -0.01).with_applied_impulse(900.0));
        assert_eq!(Impact::from_manifold(&manifold), None);

        let separated = ContactManifold::new(ball, target).with_point(
            ContactPoint::new(Vec3::ZERO, -Vec3::Z, 0.01).with_applied_impulse(900.0),
        );
        assert_eq!(Impact::from_manifold(&separated), None);
        assert_eq!(rig.run(&[manifold, separated]), Ok(0));
        assert!(rig.world.contains(target));
    }

    #[test]
    fn test_unrendered_pair_is_skipped() {
        let mut rig = Rig::new(SimulationConfig::default());
        let a = rig.ball(Vec3::ZERO, false);
        let b = rig.ball(Vec3::X, false);
        assert_eq!(rig.run(&[hit(a, b, Vec3::ZERO, 5000.0)]), Ok(0));
        assert!(rig.world.contains(a) && rig.world.contains(b));
    }

    #[test]
    fn test_overflow_stops_pass_but_flushes() {
        let config = SimulationConfig {
            removal_queue_capacity: 1,
            ..SimulationConfig::default()
        };
        let mut rig = Rig::new(config);
        let first = rig.breakable_box(Vec3::new(0.0, 0.0, 10.0));
        let second = rig.breakable_box(Vec3::new(20.0, 0.0, 10.0));
        let ball_a = rig.ball(Vec3::new(0.0, 0.0, 7.6), true);
        let ball_b = rig.ball(Vec3::new(20.0, 0.0, 7.6), true);

        let result = rig.run(&[
            hit(ball_a, first, Vec3::new(0.0, 0.0, 8.0), 800.0),
            hit(ball_b, second, Vec3::new(20.0, 0.0, 8.0), 800.0),
        ]);
        assert_eq!(result, Err(RemovalQueueOverflow { capacity: 1 }));
        assert!(!rig.world.contains(first));
        assert!(rig.world.contains(second));
        assert!(!rig.world.body(second).unwrap().is_collided());
        assert!(rig.processor.queue().is_empty());
        assert_eq!(rig.processor.state(), ProcessorState::Idle);
    }
}
