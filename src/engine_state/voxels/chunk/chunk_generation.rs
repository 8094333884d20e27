//! # Chunk Generation
//!
//! Fills a chunk from a `TerrainSampler`:
//!
//! 1. `initialize` - every voxel empty
//! 2. `generate_resources` - ore and pocket voxels from the resource layers
//! 3. `generate_terrain` - column fill, vegetation, then the edit-log overrides
//! 4. `generate_mesh` - instances for every visible voxel
//!
//! Vegetation that reaches past the chunk border is returned as `StagedWrite`s
//! addressed in the neighbouring chunk, never written into it directly.

use cgmath::{Point2, Point3};
use log::debug;

use crate::engine_state::{
    terrain::{HeightMap, TerrainSampler, TreeShape, SOIL_DEPTH},
    voxels::{
        block::{block_type::BlockType, Block},
        edits::{ChunkEdits, EditKey, StagedWrite},
    },
};

use super::Chunk;

impl Chunk {
    /// Runs the whole generation pipeline and marks the chunk loaded.
    ///
    /// # Arguments
    /// * `sampler` - The terrain decisions for the current parameter snapshot
    /// * `edits` - Overrides recorded for this chunk, applied last
    ///
    /// # Returns
    /// Leaves that belong to neighbouring chunks.
    pub fn generate(&mut self, sampler: &TerrainSampler, edits: &ChunkEdits) -> Vec<StagedWrite> {
        self.initialize();
        self.generate_resources(sampler);
        let staged = self.generate_terrain(sampler, edits);
        self.generate_mesh();
        self.loaded = true;

        debug!(
            "Generated chunk ({}, {}): {} instances, {} staged writes",
            self.position.x,
            self.position.y,
            self.instance_count(),
            staged.len()
        );
        staged
    }

    fn global_column(&self, x: i32, z: i32) -> (i32, i32) {
        let width = self.size.width as i32;
        (self.position.x * width + x, self.position.y * width + z)
    }

    /// Marks the voxels claimed by a resource layer.
    pub fn generate_resources(&mut self, sampler: &TerrainSampler) {
        let width = self.size.width as i32;
        let height = self.size.height as i32;
        for x in 0..width {
            for z in 0..width {
                let (gx, gz) = self.global_column(x, z);
                for y in 0..height {
                    let Some(i) = self.index(x, y, z) else {
                        continue;
                    };
                    if self.blocks[i].is_resource {
                        continue;
                    }
                    if let Some(resource) = sampler.resource_at(gx, y, gz) {
                        self.blocks[i] = Block::resource(resource);
                    }
                }
            }
        }
    }

    /// Fills the columns, plants vegetation and replays `edits`.
    ///
    /// Resource voxels survive only inside solid ground. Staged leaves from
    /// neighbours fill empty voxels; user edits are applied after everything
    /// else so they always win.
    pub fn generate_terrain(
        &mut self,
        sampler: &TerrainSampler,
        edits: &ChunkEdits,
    ) -> Vec<StagedWrite> {
        let heights = sampler.height_map(self.position.x, self.position.y);
        self.fill_columns(sampler, &heights);
        let staged = self.plant_vegetation(sampler, &heights);

        for (local, block_type) in &edits.staged {
            if let Some(i) = self.index(local.x, local.y, local.z) {
                if self.blocks[i].is_empty() {
                    self.blocks[i] = Block::new(*block_type);
                }
            }
        }
        for (local, block_type) in &edits.edits {
            if let Some(i) = self.index(local.x, local.y, local.z) {
                self.blocks[i] = Block::new(*block_type);
            }
        }
        staged
    }

    fn fill_columns(&mut self, sampler: &TerrainSampler, heights: &HeightMap) {
        let width = self.size.width as i32;
        let height = self.size.height as i32;
        for x in 0..width {
            for z in 0..width {
                let surface = heights.get(x as usize, z as usize);
                let (gx, gz) = self.global_column(x, z);
                let profile = sampler.biome_at(gx, gz, surface).profile();

                for y in 0..height {
                    let Some(i) = self.index(x, y, z) else {
                        continue;
                    };
                    let block = &mut self.blocks[i];
                    if y > surface {
                        *block = Block::empty();
                    } else if !block.is_resource {
                        block.block_type = if y == surface {
                            profile.top
                        } else if y >= surface - SOIL_DEPTH {
                            profile.filler
                        } else {
                            BlockType::Stone
                        };
                    }
                }
            }
        }
    }

    fn plant_vegetation(
        &mut self,
        sampler: &TerrainSampler,
        heights: &HeightMap,
    ) -> Vec<StagedWrite> {
        let width = self.size.width as i32;
        let mut staged = Vec::new();
        for x in 0..width {
            for z in 0..width {
                let surface = heights.get(x as usize, z as usize);
                let (gx, gz) = self.global_column(x, z);
                let biome = sampler.biome_at(gx, gz, surface);

                let grounded = self
                    .get_block_at(x, surface, z)
                    .is_some_and(|block| block.block_type == biome.profile().top);
                if !grounded {
                    continue;
                }
                if let Some(tree) = sampler.tree_at(gx, gz, biome) {
                    self.plant_tree(sampler, Point3::new(x, surface, z), tree, &mut staged);
                }
            }
        }
        staged
    }

    fn plant_tree(
        &mut self,
        sampler: &TerrainSampler,
        root: Point3<i32>,
        tree: TreeShape,
        staged: &mut Vec<StagedWrite>,
    ) {
        let world_height = self.size.height as i32;
        let top = root.y + tree.trunk_height;

        for y in root.y + 1..=top.min(world_height - 1) {
            let Some(i) = self.index(root.x, y, root.z) else {
                continue;
            };
            let block = self.blocks[i];
            if block.is_empty() || block.block_type.is_leaves() {
                self.blocks[i] = Block::new(tree.trunk);
            }
        }

        let Some((leaves, radius)) = tree.canopy else {
            return;
        };
        let width = self.size.width as i32;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let distance_squared = dx * dx + dy * dy + dz * dz;
                    if distance_squared > radius * radius {
                        continue;
                    }
                    let (lx, y, lz) = (root.x + dx, top + dy, root.z + dz);
                    if !(0..world_height).contains(&y) {
                        continue;
                    }
                    let (gx, gz) = self.global_column(lx, lz);
                    if sampler.leaf_skip(gx, y, gz, distance_squared, radius) {
                        continue;
                    }

                    if let Some(i) = self.index(lx, y, lz) {
                        if self.blocks[i].is_empty() {
                            self.blocks[i] = Block::new(leaves);
                        }
                    } else {
                        let chunk = Point2::new(gx.div_euclid(width), gz.div_euclid(width));
                        let local = Point3::new(gx.rem_euclid(width), y, gz.rem_euclid(width));
                        staged.push(StagedWrite {
                            key: EditKey::new(chunk, local),
                            block_type: leaves,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::{TerrainParameters, WorldSize};

    fn sampler(size: WorldSize) -> TerrainSampler {
        TerrainSampler::new(TerrainParameters::default(), size)
    }

    fn generated(position: Point2<i32>, size: WorldSize) -> (Chunk, Vec<StagedWrite>) {
        let mut chunk = Chunk::new(position, size);
        let staged = chunk.generate(&sampler(size), &ChunkEdits::default());
        (chunk, staged)
    }

    fn snapshot(chunk: &Chunk) -> Vec<(Point3<i32>, BlockType)> {
        chunk.iter_blocks().map(|(p, b)| (p, b.block_type)).collect()
    }

    #[test]
    fn generation_is_repeatable() {
        let size = WorldSize { width: 16, height: 64 };
        let (a, staged_a) = generated(Point2::new(1, -2), size);
        let (b, staged_b) = generated(Point2::new(1, -2), size);
        assert!(a.is_loaded());
        assert_eq!(snapshot(&a), snapshot(&b));
        assert_eq!(staged_a, staged_b);
        assert_eq!(a.instance_count(), b.instance_count());
    }

    #[test]
    fn columns_follow_the_height_map() {
        let size = WorldSize { width: 16, height: 64 };
        let sampler = sampler(size);
        let mut chunk = Chunk::new(Point2::new(0, 0), size);
        chunk.initialize();
        let heights = sampler.height_map(0, 0);
        chunk.fill_columns(&sampler, &heights);

        for x in 0..16 {
            for z in 0..16 {
                let surface = heights.get(x as usize, z as usize);
                let top = chunk.get_block_at(x, surface, z).unwrap();
                let expected = sampler.biome_at(x, z, surface).profile().top;
                assert_eq!(top.block_type, expected);
                for y in surface + 1..64 {
                    assert!(chunk.get_block_at(x, y, z).unwrap().is_empty());
                }
                if surface > SOIL_DEPTH {
                    let deep = chunk.get_block_at(x, 0, z).unwrap();
                    assert_eq!(deep.block_type, BlockType::Stone);
                }
            }
        }
    }

    #[test]
    fn resources_sit_inside_solid_ground() {
        let size = WorldSize { width: 16, height: 64 };
        let (chunk, _) = generated(Point2::new(0, 0), size);
        let heights = sampler(size).height_map(0, 0);
        for (position, block) in chunk.iter_blocks() {
            if block.is_resource {
                assert!(position.y <= heights.get(position.x as usize, position.z as usize));
            }
        }
    }

    #[test]
    fn edits_override_generated_terrain() {
        let size = WorldSize { width: 16, height: 64 };
        let heights = sampler(size).height_map(0, 0);
        let surface = heights.get(3, 4);

        let edits = ChunkEdits {
            staged: vec![
                (Point3::new(3, surface, 4), BlockType::OakLeaves),
                (Point3::new(3, surface + 1, 4), BlockType::OakLeaves),
                (Point3::new(9, 63, 9), BlockType::OakLeaves),
            ],
            edits: vec![
                (Point3::new(3, surface + 1, 4), BlockType::Bookshelf),
                (Point3::new(3, surface, 4), BlockType::Empty),
                (Point3::new(40, 0, 0), BlockType::Stone),
            ],
        };
        let mut chunk = Chunk::new(Point2::new(0, 0), size);
        chunk.generate(&sampler(size), &edits);

        assert_eq!(
            chunk.get_block_at(3, surface + 1, 4).unwrap().block_type,
            BlockType::Bookshelf
        );
        assert!(chunk.get_block_at(3, surface, 4).unwrap().is_empty());
        assert_eq!(
            chunk.get_block_at(9, 63, 9).unwrap().block_type,
            BlockType::OakLeaves
        );
    }

    #[test]
    fn staged_leaves_never_replace_ground() {
        let size = WorldSize { width: 16, height: 64 };
        let heights = sampler(size).height_map(0, 0);
        let surface = heights.get(7, 7);
        let edits = ChunkEdits {
            staged: vec![(Point3::new(7, surface, 7), BlockType::SpruceLeaves)],
            edits: Vec::new(),
        };
        let mut chunk = Chunk::new(Point2::new(0, 0), size);
        chunk.generate(&sampler(size), &edits);
        assert!(!chunk.get_block_at(7, surface, 7).unwrap().block_type.is_leaves());
    }

    #[test]
    fn staged_writes_address_other_chunks() {
        let size = WorldSize { width: 16, height: 96 };
        let mut found = 0;
        for cx in -2..2 {
            for cz in -2..2 {
                let (_, staged) = generated(Point2::new(cx, cz), size);
                for write in staged {
                    found += 1;
                    assert_ne!(write.key.chunk(), Point2::new(cx, cz));
                    assert!((write.key.cx - cx).abs() <= 1 && (write.key.cz - cz).abs() <= 1);
                    assert!((0..16).contains(&write.key.x));
                    assert!((0..16).contains(&write.key.z));
                    assert!((0..96).contains(&write.key.y));
                    assert!(write.block_type.is_leaves());
                }
            }
        }
        // Sixteen chunks of terrain are enough for at least one border canopy.
        assert!(found > 0);
    }

    #[test]
    fn trees_stand_on_their_biome_surface() {
        let size = WorldSize { width: 16, height: 96 };
        let sampler = sampler(size);
        let (chunk, _) = generated(Point2::new(0, 0), size);
        let heights = sampler.height_map(0, 0);
        for (position, block) in chunk.iter_blocks() {
            if block.block_type.is_wood() {
                let surface = heights.get(position.x as usize, position.z as usize);
                assert!(position.y > surface);
            }
        }
    }
}
