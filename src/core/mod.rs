//! # Core Module
//!
//! Shared-ownership primitives used across the world engine.
//!
//! The engine runs on the single render thread (see the `engine_state` docs), so
//! the only container needed is the single-threaded `StResource`. Chunk handles
//! handed to the renderer and the in-memory persistence slot are both built on it.
//!
//! ## Usage
//! ```rust
//! use voxel_world::core::StResource;
//!
//! let counter = StResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod st_resource;

pub use st_resource::StResource;
