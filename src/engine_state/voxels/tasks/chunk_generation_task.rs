//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which generates one chunk at
//! an idle point of the frame loop. The task is scheduled when a chunk is
//! registered around the player or when new terrain parameters invalidate it.

use cgmath::Point2;
use log::debug;

use crate::engine_state::{task_management::task::Task, voxels::world::WorldManager};

/// A task that generates the chunk at `position`.
///
/// The task only remembers where and in which epoch it was scheduled. When it
/// runs it re-checks that the chunk is still registered, still unloaded, and
/// that the terrain parameters did not change in the meantime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkGenerationTask {
    /// The chunk coordinates to generate
    position: Point2<i32>,
    /// World epoch at scheduling time
    epoch: u64,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates to generate
    /// * `epoch` - The world's current generation epoch
    pub fn new(position: Point2<i32>, epoch: u64) -> Self {
        ChunkGenerationTask { position, epoch }
    }

    /// The chunk coordinates this task generates.
    pub fn position(&self) -> Point2<i32> {
        self.position
    }
}

impl Task<WorldManager> for ChunkGenerationTask {
    fn process(self: Box<Self>, world: &mut WorldManager) {
        let (cx, cz) = (self.position.x, self.position.y);
        if world.epoch() != self.epoch {
            debug!("Skipping stale generation of chunk ({cx}, {cz})");
            return;
        }
        if !world.has_chunk(cx, cz) || world.is_chunk_loaded(cx, cz) {
            return;
        }
        world.generate_chunk(cx, cz);
    }

    fn label(&self) -> String {
        format!("generate chunk ({}, {})", self.position.x, self.position.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        config::{TerrainParameters, WorldSize},
        voxels::edits::{MemoryEditStorage, WorldEditsStore},
    };

    fn world() -> WorldManager {
        WorldManager::new(
            WorldSize { width: 8, height: 32 },
            TerrainParameters::default(),
            WorldEditsStore::new(Box::new(MemoryEditStorage::new())),
        )
    }

    #[test]
    fn generates_registered_chunk() {
        let mut world = world();
        world.create_chunk(0, 1);
        Box::new(ChunkGenerationTask::new(Point2::new(0, 1), world.epoch())).process(&mut world);
        assert!(world.is_chunk_loaded(0, 1));
    }

    #[test]
    fn skips_unregistered_chunk() {
        let mut world = world();
        Box::new(ChunkGenerationTask::new(Point2::new(4, 4), world.epoch())).process(&mut world);
        assert!(!world.has_chunk(4, 4));
    }

    #[test]
    fn skips_stale_epoch() {
        let mut world = world();
        world.create_chunk(0, 0);
        let task = ChunkGenerationTask::new(Point2::new(0, 0), world.epoch());
        world.set_terrain_parameters(TerrainParameters {
            seed: 1,
            ..Default::default()
        });
        Box::new(task).process(&mut world);
        assert!(!world.is_chunk_loaded(0, 0));
    }
}
