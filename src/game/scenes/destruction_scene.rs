//! DestructionScene: the physics world composed with the destruction
//! systems.
//!
//! Owns the world, the scene object registry and the collision processor.
//! [`tick`](DestructionScene::tick) is the single per-frame entry point:
//! step the world, mirror transforms to the render scene, then fracture and
//! remove bodies. Everything the render layer needs leaves through
//! [`SceneEvent`]s. **No GPU imports**: this module only describes geometry.

use std::fmt;

use glam::{Quat, Vec3};

use crate::game::config::{ConfigError, SimulationConfig};
use crate::game::fracture::ConvexMesh;
use crate::game::systems::{
    CollisionProcessor, ProcessorState, RemovalQueueOverflow, SceneObjectRegistry,
};
use crate::game::types::{
    GeometryDescriptor, InstanceTransform, MeshDescriptor, ObjectId, ObjectIdAllocator, SceneEvent,
};
use crate::physics::{
    BodyHandle, CollisionShape, ContactManifold, ConvexHullBuilder, InvalidShapeError,
    PhysicsWorld, RigidBodyDesc, RigidBodyFactory, SpawnRequest, Transform, WorldReentryError,
};

/// Tessellation of projectile spheres handed to the render layer.
const PROJECTILE_SEGMENTS: u32 = 16;

/// Ground slab of the reference scene (half extents, meters).
const GROUND_HALF_EXTENTS: Vec3 = Vec3::new(20.0, 0.5, 20.0);
/// Breakable boxes of the reference scene.
const TOWER_BOX_HALF_EXTENT: f32 = 2.0;
const TOWER_BOX_MASS: f32 = 1000.0;
const TOWER_BOX_COUNT: usize = 3;

/// Errors surfaced by scene operations.
#[derive(Debug)]
pub enum SimulationError {
    InvalidShape(InvalidShapeError),
    WorldReentry(WorldReentryError),
    RemovalQueueOverflow(RemovalQueueOverflow),
    Config(ConfigError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidShape(e) => write!(f, "invalid shape: {}", e),
            SimulationError::WorldReentry(e) => write!(f, "{}", e),
            SimulationError::RemovalQueueOverflow(e) => write!(f, "{}", e),
            SimulationError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::InvalidShape(e) => Some(e),
            SimulationError::WorldReentry(e) => Some(e),
            SimulationError::RemovalQueueOverflow(e) => Some(e),
            SimulationError::Config(e) => Some(e),
        }
    }
}

impl From<InvalidShapeError> for SimulationError {
    fn from(e: InvalidShapeError) -> Self {
        SimulationError::InvalidShape(e)
    }
}

impl From<WorldReentryError> for SimulationError {
    fn from(e: WorldReentryError) -> Self {
        SimulationError::WorldReentry(e)
    }
}

impl From<RemovalQueueOverflow> for SimulationError {
    fn from(e: RemovalQueueOverflow) -> Self {
        SimulationError::RemovalQueueOverflow(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

/// The destructible scene.
#[derive(Debug)]
pub struct DestructionScene {
    config: SimulationConfig,
    world: PhysicsWorld,
    registry: SceneObjectRegistry,
    processor: CollisionProcessor,
    factory: RigidBodyFactory,
    hull_builder: ConvexHullBuilder,
    ids: ObjectIdAllocator,
    events: Vec<SceneEvent>,
    /// Manifolds of the last tick, as seen by the collision pass.
    manifolds: Vec<ContactManifold>,
}

impl DestructionScene {
    /// Empty scene with its own physics world.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let world = PhysicsWorld::with_config(config.world)?;
        Ok(Self {
            registry: SceneObjectRegistry::new(),
            processor: CollisionProcessor::new(&config),
            factory: RigidBodyFactory::new(config.body.friction),
            hull_builder: ConvexHullBuilder::new(config.body.collision_margin),
            ids: ObjectIdAllocator::new(),
            events: Vec::new(),
            manifolds: Vec::new(),
            world,
            config,
        })
    }

    /// Ground slab plus a row of breakable boxes.
    pub fn reference_scene(config: SimulationConfig) -> Result<Self, SimulationError> {
        let mut scene = Self::new(config)?;
        scene.add_box(
            GROUND_HALF_EXTENTS,
            0.0,
            Vec3::new(0.0, -0.5, 0.0),
            Quat::IDENTITY,
            false,
        )?;
        for i in 0..TOWER_BOX_COUNT {
            let m = (i + 1) as f32;
            scene.add_box(
                Vec3::splat(TOWER_BOX_HALF_EXTENT),
                TOWER_BOX_MASS,
                Vec3::new(-10.0 * m + 20.0 * i as f32, 10.0, m),
                Quat::IDENTITY,
                true,
            )?;
        }
        log::info!(
            "Reference scene built: {} bodies, {} breakable",
            scene.world.body_count(),
            scene.processor.breakable_count()
        );
        Ok(scene)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn registry(&self) -> &SceneObjectRegistry {
        &self.registry
    }

    pub fn processor(&self) -> &CollisionProcessor {
        &self.processor
    }

    pub fn processor_state(&self) -> ProcessorState {
        self.processor.state()
    }

    /// Manifolds evaluated by the last tick.
    pub fn manifolds(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    /// Body currently rendered as `object`.
    pub fn body_of(&self, object: ObjectId) -> Option<BodyHandle> {
        self.world.handles().find(|&handle| {
            self.world
                .body(handle)
                .is_some_and(|body| body.render_handle() == Some(object))
        })
    }

    /// Launch a ball from `origin` along `direction`.
    pub fn spawn_projectile(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
    ) -> Result<ObjectId, SimulationError> {
        let request = SpawnRequest::new(origin, direction, speed);
        let object = self.ids.next_id();
        let desc = request
            .body_desc(&self.config.projectile)?
            .with_render_handle(object);
        self.factory
            .create_rigid_body(&mut self.world, &mut self.registry, desc)?;
        self.events.push(SceneEvent::ObjectCreated {
            object,
            geometry: GeometryDescriptor::uv_sphere(self.config.projectile.radius, PROJECTILE_SEGMENTS),
        });
        Ok(object)
    }

    /// Launch a ball at the configured projectile speed.
    pub fn fire(&mut self, origin: Vec3, direction: Vec3) -> Result<ObjectId, SimulationError> {
        self.spawn_projectile(origin, direction, self.config.projectile.speed)
    }

    /// Add a convex object described by its vertex buffer.
    ///
    /// Breakable meshes get fracture metadata; every mesh collides as the
    /// convex hull of its vertices. Supplied indices must form whole
    /// triangles over existing vertices.
    pub fn add_mesh(&mut self, mesh: MeshDescriptor) -> Result<ObjectId, SimulationError> {
        let shape = self.hull_builder.build_from_positions(&mesh.positions)?;
        let vertex_count = mesh.positions.len() / 3;
        if mesh.indices.len() % 3 != 0
            || mesh.indices.iter().any(|&i| i as usize >= vertex_count)
        {
            return Err(InvalidShapeError::InvalidDimensions.into());
        }
        let prepared = if mesh.breakable {
            let mut prepared = self.processor.engine().prepare_breakable(
                &mesh.positions,
                mesh.mass,
                Vec3::ZERO,
                Vec3::ZERO,
                true,
            )?;
            prepared.transform = Transform::new(mesh.position, mesh.orientation);
            Some(prepared)
        } else {
            None
        };

        let geometry = match (&prepared, mesh.indices.is_empty()) {
            (_, false) => GeometryDescriptor::new(mesh.positions.clone(), mesh.indices.clone()),
            (Some(object), true) => object.geometry(),
            (None, true) => {
                let hull = ConvexMesh::from_flat_positions(&mesh.positions)?;
                GeometryDescriptor::new(hull.flat_positions(), hull.indices())
            }
        };

        let object = self.ids.next_id();
        let desc = RigidBodyDesc::new(shape, mesh.mass)
            .with_position(mesh.position)
            .with_orientation(mesh.orientation)
            .with_render_handle(object)
            .with_breakable(mesh.breakable);
        let handle = self
            .factory
            .create_rigid_body(&mut self.world, &mut self.registry, desc)?;
        if let Some(prepared) = prepared {
            self.processor.track(handle, prepared);
        }
        self.events.push(SceneEvent::ObjectCreated { object, geometry });
        Ok(object)
    }

    /// Add a box. Breakable boxes take the mesh path; others collide as an
    /// exact cuboid.
    pub fn add_box(
        &mut self,
        half_extents: Vec3,
        mass: f32,
        position: Vec3,
        orientation: Quat,
        breakable: bool,
    ) -> Result<ObjectId, SimulationError> {
        let geometry = GeometryDescriptor::from_box(half_extents);
        if breakable {
            return self.add_mesh(
                MeshDescriptor::new(geometry.positions, mass, true)
                    .at(position, orientation)
                    .with_indices(geometry.indices),
            );
        }

        let shape = CollisionShape::cuboid(half_extents, self.config.body.collision_margin)?;
        let object = self.ids.next_id();
        let desc = RigidBodyDesc::new(shape, mass)
            .with_position(position)
            .with_orientation(orientation)
            .with_render_handle(object);
        self.factory
            .create_rigid_body(&mut self.world, &mut self.registry, desc)?;
        self.events.push(SceneEvent::ObjectCreated { object, geometry });
        Ok(object)
    }

    /// Remove an object from the simulation and the render scene.
    pub fn remove_object(&mut self, object: ObjectId) -> bool {
        let Some(handle) = self.body_of(object) else {
            return false;
        };
        self.world.remove_body(handle);
        self.registry.unregister(handle);
        self.processor.forget(handle);
        self.events.push(SceneEvent::ObjectDestroyed { object });
        true
    }

    /// Advance one frame of `delta_time` seconds.
    ///
    /// Returns the number of bodies fractured this tick.
    ///
    /// # Errors
    /// [`SimulationError::RemovalQueueOverflow`] when the collision pass ran
    /// out of removal slots. The world stays consistent and the next tick
    /// proceeds normally.
    pub fn tick(&mut self, delta_time: f32) -> Result<usize, SimulationError> {
        self.world.step(delta_time, self.config.world.max_sub_steps);
        self.registry.sync_all(&mut self.world, &mut self.events);

        self.manifolds.clear();
        self.manifolds.extend(self.world.manifolds().cloned());
        let fractured = self.processor.process(
            &mut self.world,
            &mut self.registry,
            &self.manifolds,
            &mut self.ids,
            &mut self.events,
        )?;
        Ok(fractured)
    }

    /// Take every event produced since the last call.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, SceneEvent> {
        self.events.drain(..)
    }

    pub fn instance_transforms(&self) -> Vec<InstanceTransform> {
        self.registry.instance_transforms(&self.world)
    }

    /// Release the physics world.
    pub fn teardown(self) {
        log::info!(
            "Destruction scene torn down ({} objects issued)",
            self.ids.issued()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_gravity() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.gravity = 0.0;
        config
    }

    #[test]
    fn test_reference_scene_layout() {
        let mut scene = DestructionScene::reference_scene(SimulationConfig::default()).unwrap();
        assert_eq!(scene.world().body_count(), 4);
        assert_eq!(scene.processor().breakable_count(), 3);
        // The ground is static and therefore not registered.
        assert_eq!(scene.registry().len(), 3);

        let created: Vec<SceneEvent> = scene.drain_events().collect();
        assert_eq!(created.len(), 4);
        let positions: Vec<Vec3> = scene
            .registry()
            .iter()
            .map(|h| scene.world().body(h).unwrap().transform().position)
            .collect();
        assert!(positions.contains(&Vec3::new(-10.0, 10.0, 1.0)));
        assert!(positions.contains(&Vec3::new(0.0, 10.0, 2.0)));
        assert!(positions.contains(&Vec3::new(10.0, 10.0, 3.0)));
    }

    #[test]
    fn test_second_scene_on_thread_rejected() {
        let scene = DestructionScene::new(SimulationConfig::default()).unwrap();
        let err = DestructionScene::new(SimulationConfig::default()).unwrap_err();
        assert!(matches!(err, SimulationError::WorldReentry(_)));
        scene.teardown();
        assert!(DestructionScene::new(SimulationConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimulationConfig::default();
        config.fracture.cuts_per_level = 0;
        let err = DestructionScene::new(config).unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }

    #[test]
    fn test_projectile_spawn() {
        let mut scene = DestructionScene::new(zero_gravity()).unwrap();
        let object = scene
            .spawn_projectile(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 2.0), 24.0)
            .unwrap();
        let handle = scene.body_of(object).unwrap();
        let body = scene.world().body(handle).unwrap();
        assert_eq!(body.transform().position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(body.linear_velocity(), Vec3::new(0.0, 0.0, 24.0));
        assert_eq!(body.mass(), 35.0);
        assert!(scene.registry().contains(handle));
    }

    #[test]
    fn test_degenerate_mesh_rejected() {
        let mut scene = DestructionScene::new(zero_gravity()).unwrap();
        let flat = MeshDescriptor::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
            1.0,
            true,
        );
        let err = scene.add_mesh(flat).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidShape(InvalidShapeError::DegenerateHull)
        ));
        assert_eq!(scene.world().body_count(), 0);
        assert_eq!(scene.drain_events().count(), 0);
    }

    #[test]
    fn test_flat_static_mesh_with_indices_rejected() {
        let mut scene = DestructionScene::new(zero_gravity()).unwrap();
        let line = MeshDescriptor::new(
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0],
            3.0,
            false,
        )
        .with_indices(vec![0, 1, 2]);
        let err = scene.add_mesh(line).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidShape(InvalidShapeError::DegenerateHull)
        ));
        assert_eq!(scene.world().body_count(), 0);
    }

    #[test]
    fn test_out_of_range_indices_rejected() {
        let mut scene = DestructionScene::new(zero_gravity()).unwrap();
        let geometry = GeometryDescriptor::from_box(Vec3::ONE);
        let mut indices = geometry.indices.clone();
        indices[5] = geometry.vertex_count() as u32;
        let mesh = MeshDescriptor::new(geometry.positions.clone(), 2.0, false).with_indices(indices);
        let err = scene.add_mesh(mesh).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidShape(InvalidShapeError::InvalidDimensions)
        ));
        assert_eq!(scene.world().body_count(), 0);
        assert_eq!(scene.drain_events().count(), 0);

        let ok = MeshDescriptor::new(geometry.positions.clone(), 2.0, false)
            .with_indices(geometry.indices.clone());
        assert!(scene.add_mesh(ok).is_ok());
    }

    #[test]
    fn test_remove_object() {
        let mut scene = DestructionScene::new(zero_gravity()).unwrap();
        let object = scene
            .add_box(Vec3::ONE, 5.0, Vec3::ZERO, Quat::IDENTITY, true)
            .unwrap();
        let handle = scene.body_of(object).unwrap();
        assert!(scene.remove_object(object));
        assert!(!scene.world().contains(handle));
        assert!(scene.processor().breakable(handle).is_none());
        assert!(!scene.remove_object(object));
        assert_eq!(
            scene.drain_events().last(),
            Some(SceneEvent::ObjectDestroyed { object })
        );
    }
}
