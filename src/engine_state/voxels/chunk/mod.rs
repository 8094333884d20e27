//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a `width x height x width` column
//! of voxels plus the instanced render data for its visible voxels.
//!
//! ## Storage
//!
//! Voxels live in one flat `Vec<Block>`, indexed `(x * height + y) * width + z`.
//! Every voxel is stored, empty ones included, so lookup is O(1).
//!
//! ## Visibility
//!
//! A voxel is visible when one of its six neighbours is empty, leaves, or
//! outside the chunk. Voxels on the chunk seams are therefore always visible;
//! chunks never look into each other.
//!
//! Each visible non-empty voxel owns exactly one instance in the chunk's
//! `InstanceBuffers`, and its `instance_id` points at that slot. `add_block_at`
//! and `remove_block_at` keep that mapping up to date incrementally:
//! - **reveal** appends an instance at the end of the buffers
//! - **hide** swap-removes the instance, rewriting the id of the voxel whose
//!   instance was moved into the hole
//!
//! so instance ids are dense (`0..count`) after every operation.

use cgmath::{Point2, Point3};

use crate::engine_state::config::WorldSize;

use super::block::{block_side::BlockSide, block_type::BlockType, Block};

mod chunk_generation;
pub mod instances;

use instances::InstanceBuffers;

/// One column of the world, `size.width` wide along X and Z.
pub struct Chunk {
    /// Chunk coordinates `(cx, cz)`
    position: Point2<i32>,
    /// Dimensions shared by every chunk in the world
    size: WorldSize,
    /// Every voxel of the chunk, see the module docs for the layout
    blocks: Vec<Block>,
    /// Render data for the visible voxels
    instances: InstanceBuffers,
    /// Set once generation finished; readers treat unloaded chunks as absent
    loaded: bool,
}

impl Chunk {
    /// Creates an empty, not yet loaded chunk.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates `(cx, cz)`
    /// * `size` - The world's chunk dimensions
    pub fn new(position: Point2<i32>, size: WorldSize) -> Self {
        Chunk {
            position,
            size,
            blocks: vec![Block::empty(); size.volume()],
            instances: InstanceBuffers::new(),
            loaded: false,
        }
    }

    /// Chunk coordinates.
    pub fn position(&self) -> Point2<i32> {
        self.position
    }

    /// World-space position of local voxel `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<f32> {
        let width = self.size.width as f32;
        Point3::new(
            self.position.x as f32 * width,
            0.0,
            self.position.y as f32 * width,
        )
    }

    /// The chunk's dimensions.
    pub fn size(&self) -> WorldSize {
        self.size
    }

    /// Whether generation has finished.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Render data of the visible voxels.
    pub fn instances(&self) -> &InstanceBuffers {
        &self.instances
    }

    /// Mutable render data, for the renderer to clear its upload flags.
    pub fn instances_mut(&mut self) -> &mut InstanceBuffers {
        &mut self.instances
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.instances.count()
    }

    #[cfg(test)]
    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Resets every voxel to empty, drops all instances and marks the chunk
    /// as not loaded.
    pub fn initialize(&mut self) {
        self.blocks.clear();
        self.blocks.resize(self.size.volume(), Block::empty());
        self.instances.clear();
        self.loaded = false;
    }

    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let width = self.size.width as i32;
        let height = self.size.height as i32;
        if !(0..width).contains(&x) || !(0..height).contains(&y) || !(0..width).contains(&z) {
            return None;
        }
        Some(((x * height + y) * width + z) as usize)
    }

    /// Gets the block at local `(x, y, z)`, `None` when out of bounds.
    pub fn get_block_at(&self, x: i32, y: i32, z: i32) -> Option<&Block> {
        self.index(x, y, z).map(|i| &self.blocks[i])
    }

    /// Sets the type of the block at local `(x, y, z)` without touching the
    /// render data. Out of bounds is a no-op.
    ///
    /// The instance id is kept, unless `block_type` is `Empty`.
    pub fn set_block_type_at(&mut self, x: i32, y: i32, z: i32, block_type: BlockType) {
        if let Some(i) = self.index(x, y, z) {
            let block = &mut self.blocks[i];
            block.block_type = block_type;
            if block_type.is_empty() {
                block.instance_id = None;
            }
        }
    }

    /// Sets the instance id of the block at local `(x, y, z)`. Out of bounds
    /// is a no-op.
    pub fn set_block_instance_id_at(&mut self, x: i32, y: i32, z: i32, instance_id: Option<u32>) {
        if let Some(i) = self.index(x, y, z) {
            self.blocks[i].instance_id = instance_id;
        }
    }

    /// Whether the block at local `(x, y, z)` has an exposed face.
    ///
    /// Out-of-bounds queries are `false`. For in-bounds voxels a neighbour
    /// outside the chunk counts as exposed.
    pub fn is_block_visible(&self, x: i32, y: i32, z: i32) -> bool {
        if self.index(x, y, z).is_none() {
            return false;
        }
        BlockSide::all().iter().any(|side| {
            let (dx, dy, dz) = side.offset();
            match self.get_block_at(x + dx, y + dy, z + dz) {
                None => true,
                Some(neighbour) => neighbour.block_type.is_see_through(),
            }
        })
    }

    /// Rebuilds every instance from scratch.
    ///
    /// Voxels are scanned in `(x, y, z)` order; each visible non-empty voxel
    /// gets the next instance id.
    pub fn generate_mesh(&mut self) {
        self.instances.clear();
        for block in self.blocks.iter_mut() {
            block.instance_id = None;
        }

        let width = self.size.width as i32;
        let height = self.size.height as i32;
        for x in 0..width {
            for y in 0..height {
                for z in 0..width {
                    self.reveal(x, y, z);
                }
            }
        }

        self.instances.mark_all_dirty();
        self.instances.recompute_bounds();
    }

    /// Places a block at local `(x, y, z)` and updates the render data.
    ///
    /// Rejected (returns `false`) when out of bounds, when `block_type` is
    /// `Empty`, or when the target is occupied or already rendered.
    pub fn add_block_at(&mut self, x: i32, y: i32, z: i32, block_type: BlockType) -> bool {
        let Some(i) = self.index(x, y, z) else {
            return false;
        };
        let target = self.blocks[i];
        if block_type.is_empty() || !target.is_empty() || target.instance_id.is_some() {
            return false;
        }

        self.blocks[i] = Block::new(block_type);
        self.reveal(x, y, z);

        for side in BlockSide::all() {
            let (dx, dy, dz) = side.offset();
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            let has_instance = self
                .get_block_at(nx, ny, nz)
                .is_some_and(|neighbour| neighbour.instance_id.is_some());
            if has_instance && !self.is_block_visible(nx, ny, nz) {
                self.hide(nx, ny, nz);
            }
        }
        true
    }

    /// Removes the block at local `(x, y, z)` and updates the render data.
    ///
    /// Rejected (returns `false`) when out of bounds, already empty, or not
    /// rendered.
    pub fn remove_block_at(&mut self, x: i32, y: i32, z: i32) -> bool {
        let Some(i) = self.index(x, y, z) else {
            return false;
        };
        let target = self.blocks[i];
        if target.is_empty() || target.instance_id.is_none() {
            return false;
        }

        self.hide(x, y, z);
        self.blocks[i] = Block::empty();

        for side in BlockSide::all() {
            let (dx, dy, dz) = side.offset();
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if self.is_block_visible(nx, ny, nz) {
                self.reveal(nx, ny, nz);
            }
        }
        true
    }

    /// Allocates an instance for a non-empty voxel that has none.
    fn reveal(&mut self, x: i32, y: i32, z: i32) {
        let Some(i) = self.index(x, y, z) else {
            return;
        };
        let block = self.blocks[i];
        if block.is_empty() || block.instance_id.is_some() || !self.is_block_visible(x, y, z) {
            return;
        }
        let id = self
            .instances
            .push(Point3::new(x, y, z), block.definition());
        self.blocks[i].instance_id = Some(id);
    }

    /// Releases the voxel's instance, moving the last instance into its slot.
    fn hide(&mut self, x: i32, y: i32, z: i32) {
        let Some(i) = self.index(x, y, z) else {
            return;
        };
        let Some(id) = self.blocks[i].instance_id.take() else {
            return;
        };
        if let Some(moved) = self.instances.swap_remove(id) {
            self.set_block_instance_id_at(moved.x, moved.y, moved.z, Some(id));
        }
    }

    /// Iterates over every non-empty voxel and its local position, in
    /// `(x, y, z)` order.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (Point3<i32>, &Block)> {
        let width = self.size.width;
        let height = self.size.height;
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| !block.is_empty())
            .map(move |(i, block)| {
                let z = i % width;
                let y = (i / width) % height;
                let x = i / (width * height);
                (Point3::new(x as i32, y as i32, z as i32), block)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_chunk() -> Chunk {
        Chunk::new(Point2::new(0, 0), WorldSize { width: 16, height: 16 })
    }

    /// Every instance below `count` maps to exactly one voxel that points back
    /// at it, and every rendered voxel is visible.
    fn assert_instances_dense(chunk: &Chunk) {
        let count = chunk.instance_count();
        let mut seen = vec![false; count];
        for (position, block) in chunk.iter_blocks() {
            if let Some(id) = block.instance_id {
                let id = id as usize;
                assert!(id < count, "instance {id} beyond count {count}");
                assert!(!seen[id], "instance {id} shared");
                seen[id] = true;
                assert_eq!(chunk.instances().voxel_for_instance(id as u32), Some(position));
                assert!(chunk.is_block_visible(position.x, position.y, position.z));
            }
        }
        assert!(seen.iter().all(|s| *s), "gap below instance count");
        for attribute in chunk.instances().attributes() {
            assert_eq!(attribute.array().len(), count * attribute.item_size());
        }
    }

    fn visibility_around(chunk: &Chunk, x: i32, y: i32, z: i32) -> Vec<(bool, bool)> {
        let mut cells = vec![(x, y, z)];
        for side in BlockSide::all() {
            let (dx, dy, dz) = side.offset();
            cells.push((x + dx, y + dy, z + dz));
        }
        cells
            .into_iter()
            .map(|(x, y, z)| {
                let rendered = chunk
                    .get_block_at(x, y, z)
                    .is_some_and(|b| b.instance_id.is_some());
                (chunk.is_block_visible(x, y, z), rendered)
            })
            .collect()
    }

    #[test]
    fn out_of_bounds_access_is_quiet() {
        let mut chunk = test_chunk();
        assert!(chunk.get_block_at(-1, 0, 0).is_none());
        assert!(chunk.get_block_at(0, 16, 0).is_none());
        assert!(chunk.get_block_at(0, 0, 16).is_none());
        assert!(!chunk.is_block_visible(16, 0, 0));
        chunk.set_block_type_at(99, 0, 0, BlockType::Stone);
        assert!(!chunk.add_block_at(0, -1, 0, BlockType::Stone));
        assert!(!chunk.remove_block_at(0, 0, 99));
        assert_eq!(chunk.iter_blocks().count(), 0);
    }

    #[test]
    fn single_voxel_is_visible_and_meshed() {
        let mut chunk = test_chunk();
        chunk.set_block_type_at(5, 5, 5, BlockType::Stone);
        assert!(chunk.is_block_visible(5, 5, 5));

        chunk.generate_mesh();
        assert_eq!(chunk.instance_count(), 1);
        assert_eq!(chunk.get_block_at(5, 5, 5).unwrap().instance_id, Some(0));
        assert!(chunk.instances().needs_update());
        assert!(chunk.instances().bounds().is_some());
    }

    #[test]
    fn stacking_keeps_exposed_voxels_visible() {
        let mut chunk = test_chunk();
        chunk.set_block_type_at(5, 5, 5, BlockType::Stone);
        chunk.generate_mesh();

        assert!(chunk.add_block_at(5, 6, 5, BlockType::Stone));
        // Four sides and the bottom of (5,5,5) are still open.
        assert!(chunk.is_block_visible(5, 5, 5));
        assert_eq!(chunk.instance_count(), 2);
        assert_instances_dense(&chunk);

        // Placing into an occupied cell is rejected.
        assert!(!chunk.add_block_at(5, 5, 5, BlockType::Dirt));
        assert_eq!(chunk.get_block_at(5, 5, 5).unwrap().block_type, BlockType::Stone);
    }

    #[test]
    fn enclosing_a_voxel_hides_it() {
        let mut chunk = test_chunk();
        chunk.set_block_type_at(5, 5, 5, BlockType::Stone);
        chunk.generate_mesh();

        for side in BlockSide::all() {
            let (dx, dy, dz) = side.offset();
            assert!(chunk.add_block_at(5 + dx, 5 + dy, 5 + dz, BlockType::Dirt));
        }
        assert!(!chunk.is_block_visible(5, 5, 5));
        assert_eq!(chunk.get_block_at(5, 5, 5).unwrap().instance_id, None);
        assert_eq!(chunk.instance_count(), 6);
        assert_instances_dense(&chunk);

        // Opening one face exposes it again.
        assert!(chunk.remove_block_at(5, 6, 5));
        assert!(chunk.get_block_at(5, 5, 5).unwrap().instance_id.is_some());
        assert_instances_dense(&chunk);
    }

    #[test]
    fn leaves_never_occlude() {
        let mut chunk = test_chunk();
        chunk.set_block_type_at(5, 5, 5, BlockType::Stone);
        for side in BlockSide::all() {
            let (dx, dy, dz) = side.offset();
            chunk.set_block_type_at(5 + dx, 5 + dy, 5 + dz, BlockType::OakLeaves);
        }
        assert!(chunk.is_block_visible(5, 5, 5));
    }

    #[test]
    fn seam_voxels_are_visible() {
        let mut chunk = test_chunk();
        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    chunk.set_block_type_at(x, y, z, BlockType::Stone);
                }
            }
        }
        assert!(chunk.is_block_visible(0, 7, 7));
        assert!(chunk.is_block_visible(7, 15, 7));
        assert!(!chunk.is_block_visible(7, 7, 7));
        chunk.generate_mesh();
        // Only the hull is rendered.
        assert_eq!(chunk.instance_count(), 16 * 16 * 16 - 14 * 14 * 14);
        assert_instances_dense(&chunk);
    }

    #[test]
    fn set_block_type_keeps_instance_unless_emptied() {
        let mut chunk = test_chunk();
        chunk.set_block_type_at(1, 1, 1, BlockType::Stone);
        chunk.generate_mesh();
        chunk.set_block_type_at(1, 1, 1, BlockType::Granite);
        assert_eq!(chunk.get_block_at(1, 1, 1).unwrap().instance_id, Some(0));
        chunk.set_block_type_at(1, 1, 1, BlockType::Empty);
        assert_eq!(chunk.get_block_at(1, 1, 1).unwrap().instance_id, None);
    }

    #[test]
    fn placing_into_a_sealed_pocket_is_not_rendered() {
        let mut chunk = test_chunk();
        for side in BlockSide::all() {
            let (dx, dy, dz) = side.offset();
            chunk.set_block_type_at(5 + dx, 5 + dy, 5 + dz, BlockType::Stone);
        }
        chunk.generate_mesh();
        assert!(chunk.add_block_at(5, 5, 5, BlockType::Dirt));
        assert_eq!(chunk.get_block_at(5, 5, 5).unwrap().instance_id, None);
        assert_eq!(chunk.instance_count(), 6);
        assert_instances_dense(&chunk);
    }

    #[test]
    fn removing_unrendered_or_empty_is_rejected() {
        let mut chunk = test_chunk();
        assert!(!chunk.remove_block_at(3, 3, 3));
        chunk.set_block_type_at(3, 3, 3, BlockType::Stone);
        // Typed but never meshed: no instance to release.
        assert!(!chunk.remove_block_at(3, 3, 3));
    }

    #[test]
    fn add_then_remove_restores_visibility() {
        let mut chunk = test_chunk();
        for x in 3..8 {
            for y in 3..8 {
                for z in 3..8 {
                    if (x + y + z) % 3 != 0 {
                        chunk.set_block_type_at(x, y, z, BlockType::Stone);
                    }
                }
            }
        }
        chunk.generate_mesh();

        // Exposed empty cells: beside, above and in a corner notch of the cube.
        for (x, y, z) in [(2, 5, 5), (5, 8, 5), (3, 3, 3)] {
            assert!(chunk.get_block_at(x, y, z).unwrap().is_empty());
            let before = visibility_around(&chunk, x, y, z);
            assert!(chunk.add_block_at(x, y, z, BlockType::Cobblestone));
            assert!(chunk.remove_block_at(x, y, z));
            assert_eq!(visibility_around(&chunk, x, y, z), before);
            assert_instances_dense(&chunk);
        }
    }

    #[test]
    fn random_edits_keep_instances_dense() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut chunk = test_chunk();
        chunk.generate_mesh();

        for _ in 0..2_000 {
            let (x, y, z) = (rng.i32(0..8), rng.i32(0..8), rng.i32(0..8));
            if rng.bool() {
                chunk.add_block_at(x, y, z, BlockType::Bricks);
            } else {
                chunk.remove_block_at(x, y, z);
            }
        }
        assert_instances_dense(&chunk);

        // An incremental mesh renders the same voxels as a full rebuild.
        let rendered: Vec<_> = chunk
            .iter_blocks()
            .filter(|(_, b)| b.instance_id.is_some())
            .map(|(p, _)| p)
            .collect();
        chunk.generate_mesh();
        let rebuilt: Vec<_> = chunk
            .iter_blocks()
            .filter(|(_, b)| b.instance_id.is_some())
            .map(|(p, _)| p)
            .collect();
        assert_eq!(rendered, rebuilt);
    }

    #[test]
    fn origin_scales_by_width() {
        let chunk = Chunk::new(Point2::new(-2, 3), WorldSize { width: 16, height: 8 });
        assert_eq!(chunk.origin(), Point3::new(-32.0, 0.0, 48.0));
    }
}
