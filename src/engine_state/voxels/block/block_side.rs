//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the three atlas face
//! groups (top, side, bottom) that the texture atlas distinguishes.

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a stable integer value. The order is:
/// [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// This is useful for iterating over the axis-adjacent neighbours of a voxel.
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Offset from a voxel to the neighbour that shares this face.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            BlockSide::FRONT => (0, 0, 1),
            BlockSide::BACK => (0, 0, -1),
            BlockSide::BOTTOM => (0, -1, 0),
            BlockSide::TOP => (0, 1, 0),
            BlockSide::LEFT => (-1, 0, 0),
            BlockSide::RIGHT => (1, 0, 0),
        }
    }
}

/// The face groups the texture atlas stores separately.
///
/// Instances carry one UV offset and one tint per group; the shader picks
/// the group from the surface normal.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum AtlasFace {
    /// Upward-facing surface
    Top,
    /// Any of the four vertical surfaces
    Side,
    /// Downward-facing surface
    Bottom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_unit_and_distinct() {
        let offsets: Vec<_> = BlockSide::all().iter().map(|s| s.offset()).collect();
        for (i, a) in offsets.iter().enumerate() {
            assert_eq!(a.0.abs() + a.1.abs() + a.2.abs(), 1);
            for b in offsets.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
