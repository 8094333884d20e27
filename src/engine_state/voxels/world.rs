//! # World Module
//!
//! This module provides the `WorldManager`, which stitches chunks into one
//! addressable world.
//!
//! ## Architecture
//!
//! The world is a sparse map from chunk coordinates `(cx, cz)` to chunk
//! handles. Chunks span the full world height, so the map is two-dimensional.
//! Handles are `StResource`s: the renderer collaborator keeps a clone to read
//! instance buffers, the manager mutates the voxels.
//!
//! Global block coordinates resolve to a chunk by floor division and to a
//! local position by wrapping (`((v % width) + width) % width`), so negative
//! coordinates land in the right chunk.
//!
//! ## Edits
//!
//! Every successful `add_block_at`/`remove_block_at` is appended to the
//! `WorldEditsStore` under the owning chunk's coordinates. When a chunk
//! generates, the store's overrides for that chunk are replayed last, so an
//! edit survives regeneration.
//!
//! ## Generation epochs
//!
//! Replacing the terrain parameters bumps an epoch counter and resets every
//! chunk to "not loaded". Deferred generation tasks remember the epoch they
//! were scheduled in and drop out if it changed.

use std::collections::HashMap;

use cgmath::{InnerSpace, Point2, Point3, Vector3};
use log::{debug, info};

use crate::core::StResource;
use crate::engine_state::{
    config::{TerrainParameters, WorldSize},
    terrain::TerrainSampler,
    voxels::{
        block::{block_type::BlockType, Block},
        chunk::Chunk,
        edits::{EditKey, StagedWrite, WorldEditsStore},
    },
};

/// Shared handle to one chunk.
pub type ChunkHandle = StResource<Chunk>;

/// Read access to voxels by global coordinate.
///
/// Unloaded or missing chunks read as `None`, never as a blocking wait.
pub trait BlockSource {
    /// Block at global `(x, y, z)`, `None` when its chunk is not loaded or the
    /// position is outside the world.
    fn get_block_at(&self, x: i32, y: i32, z: i32) -> Option<Block>;
}

/// Result of a voxel raycast.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    /// The first non-empty voxel along the ray
    pub block: Point3<i32>,
    /// The voxel the ray passed through just before `block`; where a placed
    /// block goes. Equals `block` when the ray starts inside a solid voxel.
    pub place: Point3<i32>,
    /// Distance from the origin to the entry point of `block`
    pub distance: f32,
}

/// Owns every chunk, the terrain sampler and the edit log.
pub struct WorldManager {
    size: WorldSize,
    sampler: TerrainSampler,
    chunks: HashMap<Point2<i32>, ChunkHandle>,
    edits: WorldEditsStore,
    epoch: u64,
}

impl WorldManager {
    /// Creates an empty world.
    ///
    /// # Arguments
    /// * `size` - Chunk dimensions
    /// * `params` - Terrain parameter snapshot
    /// * `edits` - Edit log replayed into every generated chunk
    pub fn new(size: WorldSize, params: TerrainParameters, edits: WorldEditsStore) -> Self {
        WorldManager {
            size,
            sampler: TerrainSampler::new(params, size),
            chunks: HashMap::new(),
            edits,
            epoch: 0,
        }
    }

    /// Chunk dimensions.
    pub fn size(&self) -> WorldSize {
        self.size
    }

    /// Terrain decisions for the current parameters.
    pub fn sampler(&self) -> &TerrainSampler {
        &self.sampler
    }

    /// Generation epoch, bumped by every parameter change.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The edit log.
    pub fn edits_mut(&mut self) -> &mut WorldEditsStore {
        &mut self.edits
    }

    /// Adds `handle` under `(cx, cz)`, replacing any chunk registered there.
    pub fn register_chunk(&mut self, cx: i32, cz: i32, handle: ChunkHandle) {
        self.chunks.insert(Point2::new(cx, cz), handle);
    }

    /// Removes the chunk at `(cx, cz)` and returns its handle.
    pub fn unregister_chunk(&mut self, cx: i32, cz: i32) -> Option<ChunkHandle> {
        self.chunks.remove(&Point2::new(cx, cz))
    }

    /// Registers an empty, not yet loaded chunk at `(cx, cz)`. Returns the
    /// existing handle when one is registered already.
    pub fn create_chunk(&mut self, cx: i32, cz: i32) -> ChunkHandle {
        let size = self.size;
        self.chunks
            .entry(Point2::new(cx, cz))
            .or_insert_with(|| StResource::new(Chunk::new(Point2::new(cx, cz), size)))
            .clone()
    }

    /// Handle of the chunk at `(cx, cz)`, loaded or not.
    pub fn chunk(&self, cx: i32, cz: i32) -> Option<ChunkHandle> {
        self.chunks.get(&Point2::new(cx, cz)).cloned()
    }

    /// Whether a chunk is registered at `(cx, cz)`.
    pub fn has_chunk(&self, cx: i32, cz: i32) -> bool {
        self.chunks.contains_key(&Point2::new(cx, cz))
    }

    /// Whether the chunk at `(cx, cz)` is registered and generated.
    pub fn is_chunk_loaded(&self, cx: i32, cz: i32) -> bool {
        self.chunks
            .get(&Point2::new(cx, cz))
            .is_some_and(|chunk| chunk.get().is_loaded())
    }

    /// Number of generated chunks.
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks
            .values()
            .filter(|chunk| chunk.get().is_loaded())
            .count()
    }

    /// Coordinates of every registered chunk, sorted.
    pub fn chunk_positions(&self) -> Vec<Point2<i32>> {
        let mut positions: Vec<_> = self.chunks.keys().copied().collect();
        positions.sort_by_key(|p| (p.x, p.y));
        positions
    }

    /// Chunk owning global column `(x, z)`.
    pub fn get_chunk_coords(&self, x: i32, z: i32) -> Point2<i32> {
        let width = self.size.width as i32;
        Point2::new(x.div_euclid(width), z.div_euclid(width))
    }

    /// Chunk-local position of global column `(x, z)`.
    pub fn local_coords(&self, x: i32, z: i32) -> (i32, i32) {
        let width = self.size.width as i32;
        (((x % width) + width) % width, ((z % width) + width) % width)
    }

    fn loaded_chunk(&self, x: i32, z: i32) -> Option<&ChunkHandle> {
        let coords = self.get_chunk_coords(x, z);
        self.chunks
            .get(&coords)
            .filter(|chunk| chunk.get().is_loaded())
    }

    /// Block at global `(x, y, z)`; `None` when the chunk is missing, not yet
    /// generated, or `y` is outside the world.
    pub fn get_block_at(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        let chunk = self.loaded_chunk(x, z)?;
        let (lx, lz) = self.local_coords(x, z);
        let block = chunk.get().get_block_at(lx, y, lz).copied();
        block
    }

    /// Places a block at global `(x, y, z)` and records the edit.
    ///
    /// # Returns
    /// `false` when the chunk is not loaded or the chunk rejected the placement.
    pub fn add_block_at(&mut self, x: i32, y: i32, z: i32, block_type: BlockType) -> bool {
        let Some(chunk) = self.loaded_chunk(x, z).cloned() else {
            return false;
        };
        let (lx, lz) = self.local_coords(x, z);
        if !chunk.get_mut().add_block_at(lx, y, lz, block_type) {
            return false;
        }
        let key = EditKey::new(self.get_chunk_coords(x, z), Point3::new(lx, y, lz));
        self.edits.record(key, block_type);
        true
    }

    /// Removes the block at global `(x, y, z)` and records the edit.
    ///
    /// # Returns
    /// `false` when the chunk is not loaded or the chunk rejected the removal.
    pub fn remove_block_at(&mut self, x: i32, y: i32, z: i32) -> bool {
        let Some(chunk) = self.loaded_chunk(x, z).cloned() else {
            return false;
        };
        let (lx, lz) = self.local_coords(x, z);
        if !chunk.get_mut().remove_block_at(lx, y, lz) {
            return false;
        }
        let key = EditKey::new(self.get_chunk_coords(x, z), Point3::new(lx, y, lz));
        self.edits.record(key, BlockType::Empty);
        true
    }

    /// Generates the registered chunk at `(cx, cz)`, replaying its edits,
    /// then distributes the vegetation it staged for its neighbours.
    ///
    /// # Returns
    /// `false` when no chunk is registered there.
    pub fn generate_chunk(&mut self, cx: i32, cz: i32) -> bool {
        let Some(chunk) = self.chunk(cx, cz) else {
            return false;
        };
        let edits = self.edits.edits_for_chunk(cx, cz);
        let staged = chunk.get_mut().generate(&self.sampler, &edits);
        self.apply_staged_writes(staged);
        true
    }

    /// Records staged vegetation against the target chunk. Targets that are
    /// already loaded also receive the block directly, through the same path
    /// as a player placement so their instances stay consistent, unless a
    /// user edit owns that voxel.
    pub fn apply_staged_writes(&mut self, writes: Vec<StagedWrite>) {
        for write in writes {
            if !self.edits.stage(write) || self.edits.get(write.key).is_some() {
                continue;
            }
            let target = write.key.chunk();
            if let Some(chunk) = self.chunk(target.x, target.y) {
                let mut chunk = chunk.get_mut();
                if chunk.is_loaded() {
                    let local = write.key.local();
                    chunk.add_block_at(local.x, local.y, local.z, write.block_type);
                }
            }
        }
    }

    /// Replaces the terrain parameters.
    ///
    /// Every registered chunk is reset to "not loaded" and staged vegetation
    /// is dropped; user edits are kept.
    ///
    /// # Returns
    /// The coordinates of every chunk that needs regenerating.
    pub fn set_terrain_parameters(&mut self, params: TerrainParameters) -> Vec<Point2<i32>> {
        self.sampler = TerrainSampler::new(params, self.size);
        self.epoch += 1;
        self.edits.clear_staged();
        for chunk in self.chunks.values() {
            chunk.get_mut().initialize();
        }
        info!(
            "Terrain parameters changed, regenerating {} chunks (epoch {})",
            self.chunks.len(),
            self.epoch
        );
        self.chunk_positions()
    }

    /// Unregistered chunks within the square `radius` around `center`,
    /// nearest first.
    pub fn chunks_to_load(&self, center: Point2<i32>, radius: i32) -> Vec<Point2<i32>> {
        let mut missing = Vec::new();
        for cx in center.x - radius..=center.x + radius {
            for cz in center.y - radius..=center.y + radius {
                if !self.has_chunk(cx, cz) {
                    missing.push(Point2::new(cx, cz));
                }
            }
        }
        missing.sort_by_key(|p| {
            let (dx, dz) = (p.x - center.x, p.y - center.y);
            (dx * dx + dz * dz, p.x, p.y)
        });
        missing
    }

    /// Registered chunks outside the square `radius` around `center`.
    pub fn chunks_to_unload(&self, center: Point2<i32>, radius: i32) -> Vec<Point2<i32>> {
        self.chunk_positions()
            .into_iter()
            .filter(|p| (p.x - center.x).abs() > radius || (p.y - center.y).abs() > radius)
            .collect()
    }

    /// Unregisters every chunk outside the square `radius` around `center`.
    ///
    /// Staged vegetation aimed at chunks more than `radius + 1` away is
    /// dropped too: every chunk that could have staged it is unloaded, and
    /// regenerating those chunks stages it again.
    pub fn unload_distant_chunks(&mut self, center: Point2<i32>, radius: i32) -> usize {
        let distant = self.chunks_to_unload(center, radius);
        for position in &distant {
            self.unregister_chunk(position.x, position.y);
        }
        let pruned = self.edits.retain_staged(|p| {
            (p.x - center.x).abs() <= radius + 1 && (p.y - center.y).abs() <= radius + 1
        });
        if !distant.is_empty() || pruned > 0 {
            debug!("Unloaded {} chunks, dropped {pruned} staged writes", distant.len());
        }
        distant.len()
    }

    /// Walks the voxels along a ray and returns the first non-empty one.
    ///
    /// Voxels are unit cubes centred on integer coordinates. Unloaded chunks
    /// read as empty.
    ///
    /// # Arguments
    /// * `origin` - Start of the ray, in world space
    /// * `direction` - Ray direction; need not be normalized
    /// * `max_distance` - How far to walk; a negative or non-finite distance
    ///   finds nothing
    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RaycastHit> {
        if !max_distance.is_finite() || max_distance < 0.0 {
            return None;
        }
        if !(origin.x.is_finite() && origin.y.is_finite() && origin.z.is_finite()) {
            return None;
        }
        let length = direction.magnitude();
        if !length.is_finite() || length <= f32::EPSILON {
            return None;
        }
        let direction = direction / length;
        let start = [origin.x + 0.5, origin.y + 0.5, origin.z + 0.5];
        let dir = [direction.x, direction.y, direction.z];

        let mut cell = [0i32; 3];
        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in 0..3 {
            cell[axis] = start[axis].floor() as i32;
            if dir[axis] > 0.0 {
                step[axis] = 1;
                t_max[axis] = (cell[axis] as f32 + 1.0 - start[axis]) / dir[axis];
                t_delta[axis] = 1.0 / dir[axis];
            } else if dir[axis] < 0.0 {
                step[axis] = -1;
                t_max[axis] = (start[axis] - cell[axis] as f32) / -dir[axis];
                t_delta[axis] = -1.0 / dir[axis];
            }
        }

        let mut previous = cell;
        let mut distance = 0.0;
        loop {
            let solid = self
                .get_block_at(cell[0], cell[1], cell[2])
                .is_some_and(|block| !block.is_empty());
            if solid {
                return Some(RaycastHit {
                    block: Point3::new(cell[0], cell[1], cell[2]),
                    place: Point3::new(previous[0], previous[1], previous[2]),
                    distance,
                });
            }

            let axis = if t_max[0] < t_max[1] && t_max[0] < t_max[2] {
                0
            } else if t_max[1] < t_max[2] {
                1
            } else {
                2
            };
            distance = t_max[axis];
            if distance > max_distance {
                return None;
            }
            previous = cell;
            cell[axis] += step[axis];
            t_max[axis] += t_delta[axis];
        }
    }
}

impl BlockSource for WorldManager {
    fn get_block_at(&self, x: i32, y: i32, z: i32) -> Option<Block> {
        WorldManager::get_block_at(self, x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::edits::MemoryEditStorage;
    use test_case::test_case;

    /// A world whose generated terrain is pressed flat to `y = 0`.
    fn flat_world() -> WorldManager {
        let edits = WorldEditsStore::new(Box::new(MemoryEditStorage::new()));
        let params = TerrainParameters {
            offset: -100.0,
            ..Default::default()
        };
        WorldManager::new(WorldSize { width: 8, height: 32 }, params, edits)
    }

    /// Registers a loaded chunk with a stone floor at `y <= 4`.
    fn add_floor_chunk(world: &mut WorldManager, cx: i32, cz: i32) {
        let handle = world.create_chunk(cx, cz);
        let mut chunk = handle.get_mut();
        for x in 0..8 {
            for z in 0..8 {
                for y in 0..=4 {
                    chunk.set_block_type_at(x, y, z, BlockType::Stone);
                }
            }
        }
        chunk.generate_mesh();
        chunk.mark_loaded();
    }

    #[test]
    fn chunk_coords_use_floor_division() {
        let world = flat_world();
        assert_eq!(world.get_chunk_coords(0, 0), Point2::new(0, 0));
        assert_eq!(world.get_chunk_coords(7, 8), Point2::new(0, 1));
        assert_eq!(world.get_chunk_coords(-1, -8), Point2::new(-1, -1));
        assert_eq!(world.get_chunk_coords(-9, 0), Point2::new(-2, 0));
        assert_eq!(world.local_coords(-1, -9), (7, 7));
        assert_eq!(world.local_coords(9, 16), (1, 0));
    }

    #[test]
    fn unloaded_chunks_read_as_absent() {
        let mut world = flat_world();
        world.create_chunk(0, 0);
        assert!(world.has_chunk(0, 0));
        assert!(!world.is_chunk_loaded(0, 0));
        assert!(world.get_block_at(1, 1, 1).is_none());
        assert!(!world.add_block_at(1, 10, 1, BlockType::Stone));
        assert!(world.get_block_at(100, 1, 1).is_none());
    }

    #[test]
    fn edits_are_logged_under_the_owning_chunk() {
        let mut world = flat_world();
        add_floor_chunk(&mut world, -1, 0);

        assert!(world.add_block_at(-3, 5, 2, BlockType::Bricks));
        assert_eq!(world.get_block_at(-3, 5, 2).unwrap().block_type, BlockType::Bricks);
        let key = EditKey::new(Point2::new(-1, 0), Point3::new(5, 5, 2));
        assert_eq!(world.edits_mut().get(key), Some(BlockType::Bricks));

        assert!(world.remove_block_at(-3, 4, 2));
        let key = EditKey::new(Point2::new(-1, 0), Point3::new(5, 4, 2));
        assert_eq!(world.edits_mut().get(key), Some(BlockType::Empty));

        // Rejected edits leave no trace.
        assert!(!world.add_block_at(-3, 0, 2, BlockType::Dirt));
        let key = EditKey::new(Point2::new(-1, 0), Point3::new(5, 0, 2));
        assert_eq!(world.edits_mut().get(key), None);
    }

    #[test]
    fn raycast_finds_floor_and_placement_cell() {
        let mut world = flat_world();
        add_floor_chunk(&mut world, 0, 0);

        let hit = world
            .raycast(Point3::new(3.0, 10.0, 3.0), Vector3::new(0.0, -1.0, 0.0), 20.0)
            .unwrap();
        assert_eq!(hit.block, Point3::new(3, 4, 3));
        assert_eq!(hit.place, Point3::new(3, 5, 3));
        assert!((hit.distance - 5.5).abs() < 1e-4);

        assert!(world
            .raycast(Point3::new(3.0, 10.0, 3.0), Vector3::new(0.0, -1.0, 0.0), 4.0)
            .is_none());
        assert!(world
            .raycast(Point3::new(3.0, 10.0, 3.0), Vector3::new(0.0, 1.0, 0.0), 50.0)
            .is_none());
        assert!(world
            .raycast(Point3::new(3.0, 10.0, 3.0), Vector3::new(0.0, 0.0, 0.0), 50.0)
            .is_none());
    }

    #[test_case(Point3::new(3.0, 10.0, 3.0), f32::INFINITY ; "infinite reach")]
    #[test_case(Point3::new(3.0, 10.0, 3.0), f32::NAN ; "nan reach")]
    #[test_case(Point3::new(3.0, 10.0, 3.0), -1.0 ; "negative reach")]
    #[test_case(Point3::new(f32::NAN, 10.0, 3.0), 20.0 ; "nan origin")]
    #[test_case(Point3::new(3.0, f32::INFINITY, 3.0), 20.0 ; "infinite origin")]
    #[test_case(Point3::new(3.0, 10.0, f32::NEG_INFINITY), 20.0 ; "negative infinite origin")]
    fn raycast_rejects_unbounded_rays(origin: Point3<f32>, max_distance: f32) {
        let mut world = flat_world();
        add_floor_chunk(&mut world, 0, 0);
        assert!(world
            .raycast(origin, Vector3::new(0.0, -1.0, 0.0), max_distance)
            .is_none());
    }

    #[test]
    fn raycast_diagonal_steps_one_axis_at_a_time() {
        let mut world = flat_world();
        add_floor_chunk(&mut world, 0, 0);
        let hit = world
            .raycast(Point3::new(1.0, 8.0, 1.0), Vector3::new(1.0, -1.0, 0.5), 30.0)
            .unwrap();
        assert_eq!(hit.block.y, 4);
        let d = hit.place - hit.block;
        assert_eq!(d.x.abs() + d.y.abs() + d.z.abs(), 1);
    }

    #[test]
    fn streaming_sets() {
        let mut world = flat_world();
        let center = Point2::new(0, 0);
        let to_load = world.chunks_to_load(center, 1);
        assert_eq!(to_load.len(), 9);
        assert_eq!(to_load[0], center);

        for p in &to_load {
            world.create_chunk(p.x, p.y);
        }
        world.create_chunk(5, 5);
        assert!(world.chunks_to_load(center, 1).is_empty());
        assert_eq!(world.chunks_to_unload(center, 1), vec![Point2::new(5, 5)]);
        assert_eq!(world.unload_distant_chunks(center, 1), 1);
        assert!(!world.has_chunk(5, 5));
    }

    #[test]
    fn parameter_change_resets_chunks() {
        let mut world = flat_world();
        world.create_chunk(0, 0);
        assert!(world.generate_chunk(0, 0));
        assert!(world.is_chunk_loaded(0, 0));
        let epoch = world.epoch();

        let positions = world.set_terrain_parameters(TerrainParameters {
            seed: 5,
            ..Default::default()
        });
        assert_eq!(positions, vec![Point2::new(0, 0)]);
        assert_eq!(world.epoch(), epoch + 1);
        assert!(!world.is_chunk_loaded(0, 0));
        assert!(!world.generate_chunk(3, 3));
    }

    #[test]
    fn staged_writes_reach_loaded_and_future_chunks() {
        let mut world = flat_world();
        add_floor_chunk(&mut world, 1, 0);

        let into_loaded = StagedWrite {
            key: EditKey::new(Point2::new(1, 0), Point3::new(2, 9, 2)),
            block_type: BlockType::OakLeaves,
        };
        let into_future = StagedWrite {
            key: EditKey::new(Point2::new(2, 0), Point3::new(0, 30, 0)),
            block_type: BlockType::OakLeaves,
        };
        world.apply_staged_writes(vec![into_loaded, into_future]);

        assert_eq!(world.get_block_at(10, 9, 2).unwrap().block_type, BlockType::OakLeaves);

        world.create_chunk(2, 0);
        world.generate_chunk(2, 0);
        assert_eq!(world.get_block_at(16, 30, 0).unwrap().block_type, BlockType::OakLeaves);
    }

    #[test]
    fn unloading_drops_staged_writes_beyond_the_retention_ring() {
        let mut world = flat_world();
        let staged = |cx: i32| StagedWrite {
            key: EditKey::new(Point2::new(cx, 0), Point3::new(0, 30, 0)),
            block_type: BlockType::OakLeaves,
        };
        world.apply_staged_writes(vec![staged(2), staged(3), staged(9)]);
        assert_eq!(world.edits_mut().staged_len(), 3);

        world.unload_distant_chunks(Point2::new(0, 0), 1);
        assert_eq!(world.edits_mut().staged_len(), 1);
        assert_eq!(world.edits_mut().edits_for_chunk(2, 0).staged.len(), 1);
        assert!(world.edits_mut().edits_for_chunk(9, 0).staged.is_empty());
    }

    #[test]
    fn staged_writes_never_replace_user_edits() {
        let mut world = flat_world();
        add_floor_chunk(&mut world, 1, 0);
        assert!(world.remove_block_at(10, 4, 2));

        world.apply_staged_writes(vec![StagedWrite {
            key: EditKey::new(Point2::new(1, 0), Point3::new(2, 4, 2)),
            block_type: BlockType::OakLeaves,
        }]);
        assert!(world.get_block_at(10, 4, 2).unwrap().is_empty());
    }
}
