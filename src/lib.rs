#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! The procedural-world engine of a browser voxel sandbox: noise-driven
//! terrain, chunked voxel storage with instanced render data, real-time block
//! editing with a persistent edit log, and fixed-timestep player collision.
//!
//! ## Key Modules
//!
//! * `core` - Shared-ownership primitives used throughout the engine
//! * `engine_state` - The world engine: terrain, voxels, task scheduling, physics
//!
//! ## Architecture
//!
//! The engine owns no window, input or renderer. A host:
//! * supplies a `WorldConfig` and an edit storage backend
//! * calls `EngineState::update` once per rendered frame with the player's intent and view
//! * uploads each loaded chunk's `InstanceBuffers` to its renderer
//!
//! The same code runs natively and on WebAssembly.
//!
//! ## Usage
//!
//! ```rust
//! use voxel_world::engine_state::{
//!     config::WorldConfig, voxels::edits::MemoryEditStorage, EngineState,
//! };
//!
//! voxel_world::init_logging();
//! let engine = EngineState::new(WorldConfig::default(), Box::new(MemoryEditStorage::new()))?;
//! assert_eq!(engine.world().loaded_chunk_count(), 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::sync::Once;

#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::wasm_bindgen;

pub mod core;
pub mod engine_state;

static LOGGER: Once = Once::new();

/// Installs the platform logger. Later calls do nothing.
///
/// Native builds log to stdout, filtered by `RUST_LOG`. WebAssembly builds log
/// to the browser console at `Info` and route panics there too.
pub fn init_logging() {
    LOGGER.call_once(|| {
        cfg_if::cfg_if! {
            if #[cfg(target_family = "wasm")] {
                std::panic::set_hook(Box::new(console_error_panic_hook::hook));
                if console_log::init_with_level(log::Level::Info).is_err() {
                    web_sys::console::warn_1(&"Logger already installed".into());
                }
            } else {
                let mut log_builder = env_logger::Builder::new();
                log_builder
                    .target(env_logger::Target::Stdout)
                    .parse_env("RUST_LOG");
                if log_builder.try_init().is_err() {
                    eprintln!("Logger already installed");
                }
            }
        }
        log::info!("Logger initialized");
    });
}

/// Entry point for the WebAssembly host.
#[cfg(target_family = "wasm")]
#[wasm_bindgen]
pub fn init_web() {
    init_logging();
}
