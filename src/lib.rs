#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A streaming voxel world: deterministic noise terrain, greedy meshing with
//! per-corner ambient occlusion, and a chunk store that keeps a circular area
//! around the viewer generated and meshed on background workers.
//!
//! ## Key Modules
//!
//! * `config` - World settings loaded from JSON
//! * `engine_state` - The world, the mesher, the task pools and the render hand-off
//!
//! ## Architecture
//!
//! The engine follows a modular architecture with clear separation between:
//! * Voxel data and terrain generation
//! * Meshing, which runs on worker threads against immutable snapshots
//! * Task scheduling and execution
//! * The chunk store, the only place chunk state changes
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_world::run().unwrap();
//! }
//! ```

use std::thread;
use std::time::Duration;

use cgmath::Point3;
use log::info;
use web_time::Instant;

use config::{ConfigError, WorldConfig};
use engine_state::{
    voxels::block::{block_type::BlockType, AIR},
    EngineState,
};

pub mod config;
pub mod engine_state;

/// Frames the demo walk runs for.
const DEMO_FRAMES: u64 = 240;
/// Distance the viewer moves along +X each frame, in blocks.
const DEMO_STEP: f32 = 0.5;
/// Frames between two demo edits.
const DEMO_EDIT_INTERVAL: u64 = 30;
/// Longest the demo waits for outstanding jobs after the walk.
const DEMO_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the headless demo.
///
/// Loads a [`WorldConfig`] from the JSON file named by the first argument (or
/// uses the defaults), walks a viewer across the world while placing a few
/// random blocks, and logs streaming statistics.
pub fn run() -> Result<(), ConfigError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    config.validate()?;

    let start = Instant::now();
    let mut engine_state = EngineState::new(config);
    let mut rng = fastrand::Rng::with_seed(engine_state.world.config().seed as u64);
    let mut viewer = Point3::new(0.0, 80.0, 0.0);

    while engine_state.frames() < DEMO_FRAMES {
        engine_state.update(viewer);
        viewer.x += DEMO_STEP;

        if engine_state.frames() % DEMO_EDIT_INTERVAL == 0 {
            place_random_log(&mut engine_state, &mut rng, viewer);
            engine_state.log_stats();
        }
        thread::sleep(Duration::from_millis(4));
    }

    let settle_start = Instant::now();
    while !engine_state.is_settled() && settle_start.elapsed() < DEMO_SETTLE_TIMEOUT {
        engine_state.update(viewer);
        thread::sleep(Duration::from_millis(4));
    }
    engine_state.log_stats();
    info!("Demo finished in {:?}", start.elapsed());
    Ok(())
}

/// Puts a log block on top of a random column near the viewer.
fn place_random_log(engine_state: &mut EngineState, rng: &mut fastrand::Rng, viewer: Point3<f32>) {
    let world = &mut engine_state.world;
    let x = viewer.x as i32 + rng.i32(-24..=24);
    let z = viewer.z as i32 + rng.i32(-24..=24);
    let height = world.config().chunk.height as i32;

    let Some(top) = (0..height)
        .rev()
        .find(|&y| world.get_block(x, y, z).is_some_and(|block| block != AIR))
    else {
        return;
    };
    match world.set_block(x, top + 1, z, BlockType::LOG.id()) {
        Ok(_) => info!("Placed a log at ({x}, {}, {z})", top + 1),
        Err(error) => info!("Could not place a log at ({x}, {}, {z}): {error}", top + 1),
    }
}
