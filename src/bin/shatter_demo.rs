//! Shatter Demo - headless destruction run
//!
//! Run with: `cargo run --bin shatter_demo [config.json]`
//!
//! Builds the reference scene (ground slab plus three breakable boxes), fires
//! one ball at each box and steps two simulated seconds, logging lifecycle
//! events. Set `RUST_LOG=debug` to see individual fractures.

use glam::Vec3;

use shatterbox_engine::game::{DestructionScene, SceneEvent, SimulationConfig, SimulationError};

const FRAME_TIME: f32 = 1.0 / 60.0;
const FRAMES: usize = 120;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(&path)?,
        None => SimulationConfig::default(),
    };

    let mut scene = DestructionScene::reference_scene(config)?;
    for target_x in [-10.0, 0.0, 10.0] {
        scene.fire(Vec3::new(target_x, 10.5, -15.0), Vec3::Z)?;
    }

    let mut created = 0usize;
    let mut destroyed = 0usize;
    let mut fractures = 0usize;
    for frame in 0..FRAMES {
        match scene.tick(FRAME_TIME) {
            Ok(count) => fractures += count,
            Err(SimulationError::RemovalQueueOverflow(overflow)) => {
                log::warn!("Frame {}: {}", frame, overflow);
            }
            Err(e) => return Err(e.into()),
        }
        for event in scene.drain_events() {
            match event {
                SceneEvent::ObjectCreated { object, geometry } => {
                    created += 1;
                    log::debug!(
                        "Frame {}: created {} ({} triangles)",
                        frame,
                        object,
                        geometry.triangle_count()
                    );
                }
                SceneEvent::ObjectDestroyed { object } => {
                    destroyed += 1;
                    log::debug!("Frame {}: destroyed {}", frame, object);
                }
                SceneEvent::TransformUpdated { .. } => {}
            }
        }
    }

    println!("Shatter demo: {} frames simulated", FRAMES);
    println!("  objects created:   {}", created);
    println!("  objects destroyed: {}", destroyed);
    println!("  fractures:         {}", fractures);
    println!("  live bodies:       {}", scene.world().body_count());
    scene.teardown();
    Ok(())
}
