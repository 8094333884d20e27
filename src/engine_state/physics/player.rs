//! # Player
//!
//! The player's physical body, the per-frame intent the input layer hands in,
//! and the view orientation the camera rig reports.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Angle, InnerSpace, Point3, Rad, Vector2, Vector3, Zero};

use crate::engine_state::voxels::block::block_type::BlockType;

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// Orientation of the player's view.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayerView {
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Default for PlayerView {
    fn default() -> Self {
        PlayerView {
            yaw: Rad(0.0),
            pitch: Rad(0.0),
        }
    }
}

impl PlayerView {
    /// Creates a view, clamping the pitch short of straight up or down.
    ///
    /// # Arguments
    /// * `yaw` - Horizontal rotation. Can be any type that converts to `Rad<f32>`.
    /// * `pitch` - Vertical rotation. Can be any type that converts to `Rad<f32>`.
    pub fn new<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(yaw: Y, pitch: P) -> Self {
        let pitch = pitch.into();
        PlayerView {
            yaw: yaw.into(),
            pitch: Rad(pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2)),
        }
    }

    /// Normalized direction the view is looking along.
    pub fn direction(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }
}

/// Horizontal forward axis for a yaw.
pub fn forward_axis(yaw: Rad<f32>) -> Vector3<f32> {
    let (yaw_sin, yaw_cos) = yaw.sin_cos();
    Vector3::new(yaw_cos, 0.0, yaw_sin)
}

/// Horizontal right axis for a yaw.
pub fn right_axis(yaw: Rad<f32>) -> Vector3<f32> {
    let (yaw_sin, yaw_cos) = yaw.sin_cos();
    Vector3::new(-yaw_sin, 0.0, yaw_cos)
}

/// The player's collision body: an upright cylinder hanging below `position`.
///
/// `velocity.x` and `velocity.z` are view-relative (right and forward along
/// `yaw`); `velocity.y` is world-space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayerBody {
    /// Eye point, the top of the cylinder
    pub position: Point3<f32>,
    /// Strafe, vertical and forward velocity
    pub velocity: Vector3<f32>,
    /// Heading the view-relative velocity is measured against
    pub yaw: Rad<f32>,
    /// Whether the last simulation step rested on a voxel
    pub on_ground: bool,
}

impl PlayerBody {
    /// Creates a body at rest.
    pub fn new(position: Point3<f32>) -> Self {
        PlayerBody {
            position,
            velocity: Vector3::new(0.0, 0.0, 0.0),
            yaw: Rad(0.0),
            on_ground: false,
        }
    }

    /// Velocity in world space.
    pub fn world_velocity(&self) -> Vector3<f32> {
        right_axis(self.yaw) * self.velocity.x
            + forward_axis(self.yaw) * self.velocity.z
            + Vector3::unit_y() * self.velocity.y
    }

    /// Sets the velocity from a world-space vector.
    pub fn set_world_velocity(&mut self, world: Vector3<f32>) {
        self.velocity = Vector3::new(
            world.dot(right_axis(self.yaw)),
            world.y,
            world.dot(forward_axis(self.yaw)),
        );
    }
}

/// What the input layer asks of the player this frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayerIntent {
    /// `x` strafes right, `y` moves forward; each in `-1..=1`
    pub movement: Vector2<f32>,
    /// Jump held
    pub jump: bool,
    /// Block placed by the primary action; `None` removes instead
    pub selected_block: Option<BlockType>,
    /// Rising edge of the primary action
    pub primary_action: bool,
}

impl Default for PlayerIntent {
    /// Standing still, nothing pressed.
    fn default() -> Self {
        PlayerIntent {
            movement: Vector2::zero(),
            jump: false,
            selected_block: None,
            primary_action: false,
        }
    }
}
