//! # Voxel World
//!
//! This module contains the voxel world itself: blocks, chunks, the manager
//! that stitches chunks together, and the edit log that outlives them.
//!
//! ## Architecture
//!
//! * **Block**: Block types, their atlas and tint table, and the per-cell `Block` value
//! * **Chunk**: A `width x height x width` voxel grid with incremental instanced render data
//! * **World**: Chunk registry, global block access, edits, raycasts and streaming
//! * **Edits**: The persistent override log replayed into every generated chunk
//! * **Tasks**: Deferred chunk generation
//!
//! ## Data Flow
//!
//! 1. Streaming registers unloaded chunks around the player and schedules their generation
//! 2. At an idle point a task generates the chunk from the terrain sampler and the edit log
//! 3. Player edits go through the world to the owning chunk and into the edit log
//! 4. The renderer collaborator reads each chunk's instance buffers
//!
//! ## Threading
//!
//! Everything runs on the render thread. Chunk handles are `StResource`s and
//! are not `Send`.

pub mod block;
pub mod chunk;
pub mod edits;
pub mod tasks;
pub mod world;
