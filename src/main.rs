//! # Headless World Walk
//!
//! Native entry point that drives the engine without a renderer: it loads an
//! optional JSON config, walks the player forward for a few seconds of
//! simulated frames and keeps edits in a file next to the working directory.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json]
//! ```

cfg_if::cfg_if! {
    if #[cfg(target_family = "wasm")] {
        fn main() {}
    } else {
        use anyhow::Context;
        use cgmath::Vector2;
        use log::info;
        use voxel_world::engine_state::{
            config::WorldConfig,
            physics::player::{PlayerIntent, PlayerView},
            voxels::edits::{edit_slot_name, FileEditStorage},
            EngineState,
        };
        use web_time::Duration;

        /// Simulated frame length.
        const FRAME: Duration = Duration::from_micros(16_667);

        /// Frames to simulate.
        const FRAMES: usize = 600;

        fn main() -> anyhow::Result<()> {
            voxel_world::init_logging();

            let config = match std::env::args().nth(1) {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading config {path}"))?;
                    WorldConfig::from_json(&json)?
                }
                None => WorldConfig::default(),
            };

            let storage = FileEditStorage::new(format!("{}.json", edit_slot_name(config.size.width)));
            let mut engine = EngineState::new(config, Box::new(storage))?;
            // The first frame queues the chunks around the spawn point.
            engine.update(&PlayerIntent::default(), PlayerView::default(), Duration::ZERO);
            let generated = engine.generate_pending();
            info!("generated {generated} chunks around spawn");
            engine.engage_controls();

            let intent = PlayerIntent {
                movement: Vector2::new(0.0, 1.0),
                ..Default::default()
            };
            for frame in 0..FRAMES {
                let report = engine.update(&intent, PlayerView::default(), FRAME);
                if frame % 60 == 0 {
                    info!(
                        "frame {frame}: position {:?}, on ground {}, {} chunks loaded, {} generated",
                        engine.body().position,
                        engine.body().on_ground,
                        engine.world().loaded_chunk_count(),
                        report.tasks_run
                    );
                }
            }

            engine.shutdown();
            Ok(())
        }
    }
}
