//! # Instance Buffers
//!
//! Per-chunk instanced render data: one instance per visible voxel.
//!
//! Every instance owns one slot in each named attribute. Ids stay dense: slot
//! `i` is live for every `i < count`, and removing a slot moves the last live
//! instance into the hole. The renderer collaborator uploads the attribute
//! arrays whose `needs_update` flag is set, then clears the flags.

use bytemuck::NoUninit;
use cgmath::{Matrix4, Point3, Vector3};

use crate::engine_state::voxels::block::{block_side::AtlasFace, BlockDefinition};

/// Attribute holding each instance's 4x4 column-major transform.
pub const INSTANCE_MATRIX: &str = "instanceMatrix";
/// Atlas offset of the top face.
pub const UV_TOP: &str = "uvTop";
/// Atlas offset of the side faces.
pub const UV_SIDE: &str = "uvSide";
/// Atlas offset of the bottom face.
pub const UV_BOTTOM: &str = "uvBottom";
/// Tint of the top face.
pub const TINT_TOP: &str = "tintTop";
/// Tint of the side faces.
pub const TINT_SIDE: &str = "tintSide";
/// Tint of the bottom face.
pub const TINT_BOTTOM: &str = "tintBottom";
/// `1.0` for alpha-tested blocks, `0.0` otherwise.
pub const CUTOUT_FLAG: &str = "cutoutFlag";

const ATTRIBUTE_LAYOUT: [(&str, usize); 8] = [
    (INSTANCE_MATRIX, 16),
    (UV_TOP, 2),
    (UV_SIDE, 2),
    (UV_BOTTOM, 2),
    (TINT_TOP, 3),
    (TINT_SIDE, 3),
    (TINT_BOTTOM, 3),
    (CUTOUT_FLAG, 1),
];

/// Trait for types that can be converted to bytes for buffer writing
pub trait AsBytes {
    /// Converts the value to a byte slice
    fn as_bytes(&self) -> &[u8];
}

impl<T> AsBytes for [T]
where
    T: NoUninit,
{
    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self)
    }
}

/// One named per-instance float attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct InstancedAttribute {
    name: &'static str,
    item_size: usize,
    array: Vec<f32>,
    needs_update: bool,
}

impl InstancedAttribute {
    fn new(name: &'static str, item_size: usize) -> Self {
        InstancedAttribute {
            name,
            item_size,
            array: Vec::new(),
            needs_update: false,
        }
    }

    /// Attribute name as seen by the shader.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Floats per instance.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Values of every live instance, packed.
    pub fn array(&self) -> &[f32] {
        &self.array
    }

    /// Values of instance `id`.
    pub fn get(&self, id: u32) -> Option<&[f32]> {
        let start = id as usize * self.item_size;
        self.array.get(start..start + self.item_size)
    }

    /// Whether the array changed since the renderer last uploaded it.
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Raw bytes of the packed array, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        self.array.as_slice().as_bytes()
    }

    fn push(&mut self, values: &[f32]) {
        debug_assert_eq!(values.len(), self.item_size);
        self.array.extend_from_slice(values);
        self.needs_update = true;
    }

    /// Copies slot `from` over slot `to`, then drops the last slot.
    fn move_last_into(&mut self, to: usize) {
        let size = self.item_size;
        let last = self.array.len() / size - 1;
        if to != last {
            self.array
                .copy_within(last * size..(last + 1) * size, to * size);
        }
        self.array.truncate(last * size);
        self.needs_update = true;
    }

    fn clear(&mut self) {
        self.array.clear();
        self.needs_update = true;
    }
}

/// Axis-aligned box around every instance, in chunk-local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderBounds {
    /// Lowest corner
    pub min: Point3<f32>,
    /// Highest corner
    pub max: Point3<f32>,
}

impl RenderBounds {
    fn around(voxel: Point3<i32>) -> Self {
        let center = Point3::new(voxel.x as f32, voxel.y as f32, voxel.z as f32);
        RenderBounds {
            min: center - Vector3::new(0.5, 0.5, 0.5),
            max: center + Vector3::new(0.5, 0.5, 0.5),
        }
    }

    fn union(self, other: RenderBounds) -> Self {
        RenderBounds {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Center of the box.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Radius of the sphere enclosing the box.
    pub fn radius(&self) -> f32 {
        let extent = self.max - self.min;
        (extent.x * extent.x + extent.y * extent.y + extent.z * extent.z).sqrt() * 0.5
    }
}

/// Dense instance storage of one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceBuffers {
    attributes: Vec<InstancedAttribute>,
    voxels: Vec<Point3<i32>>,
    bounds: Option<RenderBounds>,
}

impl Default for InstanceBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceBuffers {
    /// Creates empty buffers with every named attribute.
    pub fn new() -> Self {
        InstanceBuffers {
            attributes: ATTRIBUTE_LAYOUT
                .iter()
                .map(|(name, size)| InstancedAttribute::new(name, *size))
                .collect(),
            voxels: Vec::new(),
            bounds: None,
        }
    }

    /// Number of live instances.
    pub fn count(&self) -> usize {
        self.voxels.len()
    }

    /// Looks up an attribute by shader name.
    pub fn attribute(&self, name: &str) -> Option<&InstancedAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Every attribute, in layout order.
    pub fn attributes(&self) -> impl Iterator<Item = &InstancedAttribute> {
        self.attributes.iter()
    }

    /// Local voxel rendered by instance `id`.
    pub fn voxel_for_instance(&self, id: u32) -> Option<Point3<i32>> {
        self.voxels.get(id as usize).copied()
    }

    /// Bounds of the live instances, `None` when there are none.
    pub fn bounds(&self) -> Option<RenderBounds> {
        self.bounds
    }

    /// Whether any attribute still has to be uploaded.
    pub fn needs_update(&self) -> bool {
        self.attributes.iter().any(InstancedAttribute::needs_update)
    }

    /// Called by the renderer after uploading.
    pub fn clear_update_flags(&mut self) {
        for attribute in self.attributes.iter_mut() {
            attribute.needs_update = false;
        }
    }

    /// Appends an instance for `voxel` and returns its id.
    ///
    /// The transform is a translation to the voxel's local position; face
    /// attributes come from the block definition.
    pub(crate) fn push(&mut self, voxel: Point3<i32>, definition: &BlockDefinition) -> u32 {
        let id = self.voxels.len() as u32;

        let translation = Matrix4::from_translation(Vector3::new(
            voxel.x as f32,
            voxel.y as f32,
            voxel.z as f32,
        ));
        let columns: [[f32; 4]; 4] = translation.into();
        let flat: Vec<f32> = columns.iter().flatten().copied().collect();

        let cutout = if definition.cutout { 1.0 } else { 0.0 };
        for attribute in self.attributes.iter_mut() {
            match attribute.name {
                INSTANCE_MATRIX => attribute.push(&flat),
                UV_TOP => attribute.push(&definition.uv_offset(AtlasFace::Top)),
                UV_SIDE => attribute.push(&definition.uv_offset(AtlasFace::Side)),
                UV_BOTTOM => attribute.push(&definition.uv_offset(AtlasFace::Bottom)),
                TINT_TOP => attribute.push(&definition.tints.top),
                TINT_SIDE => attribute.push(&definition.tints.side),
                TINT_BOTTOM => attribute.push(&definition.tints.bottom),
                CUTOUT_FLAG => attribute.push(&[cutout]),
                _ => {}
            }
        }

        self.voxels.push(voxel);
        let around = RenderBounds::around(voxel);
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.union(around),
            None => around,
        });
        id
    }

    /// Removes instance `id` by moving the last live instance into its slot.
    ///
    /// Returns the voxel whose instance now lives at `id`, if a move happened.
    /// The caller must rewrite that voxel's stored id. Bounds are left as a
    /// conservative superset until the next `recompute_bounds`.
    pub(crate) fn swap_remove(&mut self, id: u32) -> Option<Point3<i32>> {
        let index = id as usize;
        if index >= self.voxels.len() {
            return None;
        }
        for attribute in self.attributes.iter_mut() {
            attribute.move_last_into(index);
        }
        self.voxels.swap_remove(index);
        if self.voxels.is_empty() {
            self.bounds = None;
        }
        self.voxels.get(index).copied()
    }

    /// Drops every instance.
    pub(crate) fn clear(&mut self) {
        for attribute in self.attributes.iter_mut() {
            attribute.clear();
        }
        self.voxels.clear();
        self.bounds = None;
    }

    /// Flags every attribute for upload.
    pub(crate) fn mark_all_dirty(&mut self) {
        for attribute in self.attributes.iter_mut() {
            attribute.needs_update = true;
        }
    }

    /// Tightens the bounds to the live instances.
    pub(crate) fn recompute_bounds(&mut self) {
        self.bounds = self
            .voxels
            .iter()
            .map(|voxel| RenderBounds::around(*voxel))
            .reduce(RenderBounds::union);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{block_type::BlockType, Block};
    use approx::assert_relative_eq;

    fn definition(block_type: BlockType) -> &'static BlockDefinition {
        Block::new(block_type).definition()
    }

    #[test]
    fn push_writes_every_attribute() {
        let mut buffers = InstanceBuffers::new();
        let id = buffers.push(Point3::new(1, 2, 3), definition(BlockType::OakLeaves));
        assert_eq!(id, 0);
        assert_eq!(buffers.count(), 1);

        for attribute in buffers.attributes() {
            assert_eq!(attribute.array().len(), attribute.item_size());
            assert!(attribute.needs_update());
        }

        let matrix = buffers.attribute(INSTANCE_MATRIX).unwrap().get(0).unwrap();
        assert_relative_eq!(matrix[12], 1.0);
        assert_relative_eq!(matrix[13], 2.0);
        assert_relative_eq!(matrix[14], 3.0);
        assert_relative_eq!(matrix[15], 1.0);

        let cutout = buffers.attribute(CUTOUT_FLAG).unwrap().get(0).unwrap();
        assert_relative_eq!(cutout[0], 1.0);
    }

    #[test]
    fn swap_remove_keeps_slots_dense() {
        let mut buffers = InstanceBuffers::new();
        buffers.push(Point3::new(0, 0, 0), definition(BlockType::Stone));
        buffers.push(Point3::new(1, 0, 0), definition(BlockType::Dirt));
        buffers.push(Point3::new(2, 0, 0), definition(BlockType::OakLeaves));

        let moved = buffers.swap_remove(0);
        assert_eq!(moved, Some(Point3::new(2, 0, 0)));
        assert_eq!(buffers.count(), 2);
        assert_eq!(buffers.voxel_for_instance(0), Some(Point3::new(2, 0, 0)));

        let matrix = buffers.attribute(INSTANCE_MATRIX).unwrap().get(0).unwrap();
        assert_relative_eq!(matrix[12], 2.0);
        let cutout = buffers.attribute(CUTOUT_FLAG).unwrap().get(0).unwrap();
        assert_relative_eq!(cutout[0], 1.0);

        assert_eq!(buffers.swap_remove(1), None);
        assert_eq!(buffers.count(), 1);
        assert_eq!(buffers.swap_remove(5), None);
    }

    #[test]
    fn bounds_follow_instances() {
        let mut buffers = InstanceBuffers::new();
        assert!(buffers.bounds().is_none());
        buffers.push(Point3::new(0, 0, 0), definition(BlockType::Stone));
        buffers.push(Point3::new(3, 4, 0), definition(BlockType::Stone));
        let bounds = buffers.bounds().unwrap();
        assert_relative_eq!(bounds.min.x, -0.5);
        assert_relative_eq!(bounds.max.y, 4.5);

        buffers.swap_remove(1);
        buffers.recompute_bounds();
        let bounds = buffers.bounds().unwrap();
        assert_relative_eq!(bounds.max.x, 0.5);
        assert_relative_eq!(bounds.center().y, 0.0);
    }

    #[test]
    fn clearing_flags_after_upload() {
        let mut buffers = InstanceBuffers::new();
        buffers.push(Point3::new(0, 0, 0), definition(BlockType::Stone));
        assert_eq!(buffers.attribute(UV_TOP).unwrap().as_bytes().len(), 8);
        buffers.clear_update_flags();
        assert!(!buffers.needs_update());
        buffers.mark_all_dirty();
        assert!(buffers.needs_update());
    }
}
