//! Scene object registry: dynamic bodies whose transforms are mirrored to the
//! render scene.

use std::collections::BTreeSet;

use crate::game::types::{InstanceTransform, SceneEvent};
use crate::physics::{BodyHandle, BodyRegistrar, PhysicsWorld};

/// Set of dynamic bodies that carry a render handle.
#[derive(Debug, Default)]
pub struct SceneObjectRegistry {
    bodies: BTreeSet<BodyHandle>,
}

impl SceneObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle`. Static bodies and bodies without a render handle are
    /// rejected.
    pub fn register(&mut self, world: &PhysicsWorld, handle: BodyHandle) -> bool {
        match world.body(handle) {
            Some(body) if body.is_dynamic() && body.render_handle().is_some() => {
                self.bodies.insert(handle)
            }
            _ => false,
        }
    }

    pub fn unregister(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.iter().copied()
    }

    /// Emit the current transform of every registered body and reset its
    /// per-step `collided` latch.
    pub fn sync_all(&self, world: &mut PhysicsWorld, events: &mut Vec<SceneEvent>) {
        for &handle in &self.bodies {
            let Some(body) = world.body_mut(handle) else {
                continue;
            };
            let Some(object) = body.render_handle() else {
                continue;
            };
            let transform = body.transform();
            body.set_collided(false);
            events.push(SceneEvent::TransformUpdated {
                object,
                position: transform.position,
                orientation: transform.orientation,
            });
        }
    }

    /// Instance records of every live registered body.
    pub fn instance_transforms(&self, world: &PhysicsWorld) -> Vec<InstanceTransform> {
        self.bodies
            .iter()
            .filter_map(|&handle| {
                let body = world.body(handle)?;
                let object = body.render_handle()?;
                let transform = body.transform();
                Some(InstanceTransform::new(object, transform.position, transform.orientation))
            })
            .collect()
    }
}

impl BodyRegistrar for SceneObjectRegistry {
    fn register(&mut self, world: &PhysicsWorld, handle: BodyHandle) -> bool {
        SceneObjectRegistry::register(self, world, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{CollisionShape, ObjectId, PhysicsBody, Transform, Vec3};

    fn body(mass: f32, object: Option<ObjectId>) -> PhysicsBody {
        PhysicsBody::new(
            CollisionShape::sphere(0.5).unwrap(),
            mass,
            Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
        )
        .unwrap()
        .with_render_handle(object)
    }

    #[test]
    fn test_only_dynamic_rendered_bodies_register() {
        let mut world = PhysicsWorld::initialize(0.0).unwrap();
        let dynamic = world.add_body(body(1.0, Some(ObjectId(1))));
        let fixed = world.add_body(body(0.0, Some(ObjectId(2))));
        let bare = world.add_body(body(1.0, None));

        let mut registry = SceneObjectRegistry::new();
        assert!(registry.register(&world, dynamic));
        assert!(!registry.register(&world, dynamic));
        assert!(!registry.register(&world, fixed));
        assert!(!registry.register(&world, bare));
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(dynamic));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sync_emits_transforms_and_resets_latch() {
        let mut world = PhysicsWorld::initialize(0.0).unwrap();
        let handle = world.add_body(body(1.0, Some(ObjectId(5))));
        world.body_mut(handle).unwrap().set_collided(true);

        let mut registry = SceneObjectRegistry::new();
        registry.register(&world, handle);
        let mut events = Vec::new();
        registry.sync_all(&mut world, &mut events);

        assert_eq!(
            events,
            vec![SceneEvent::TransformUpdated {
                object: ObjectId(5),
                position: Vec3::new(1.0, 2.0, 3.0),
                orientation: glam::Quat::IDENTITY,
            }]
        );
        assert!(!world.body(handle).unwrap().is_collided());
    }

    #[test]
    fn test_removed_bodies_are_skipped() {
        let mut world = PhysicsWorld::initialize(0.0).unwrap();
        let handle = world.add_body(body(1.0, Some(ObjectId(5))));
        let mut registry = SceneObjectRegistry::new();
        registry.register(&world, handle);
        world.remove_body(handle);

        let mut events = Vec::new();
        registry.sync_all(&mut world, &mut events);
        assert!(events.is_empty());
        assert!(registry.instance_transforms(&world).is_empty());
    }

    #[test]
    fn test_instance_transforms() {
        let mut world = PhysicsWorld::initialize(0.0).unwrap();
        let handle = world.add_body(body(1.0, Some(ObjectId(3))));
        let mut registry = SceneObjectRegistry::new();
        registry.register(&world, handle);
        let instances = registry.instance_transforms(&world);
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].object_id, 3);
        assert_eq!(instances[0].position, [1.0, 2.0, 3.0]);
    }
}
