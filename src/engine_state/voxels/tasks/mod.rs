//! # Voxel Task System
//!
//! This module contains the deferred tasks of the voxel world. They run on the
//! render thread at idle points, scheduled by the `TaskManager`.

pub mod chunk_generation_task;
