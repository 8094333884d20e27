//! # Physics
//!
//! Player-versus-voxel collision at a fixed simulation rate.
//!
//! The `CollisionSolver` integrates a variable frame delta with an accumulator
//! and runs whole steps of `1 / step_rate` seconds. Each step applies gravity,
//! moves the player along its view-relative basis and then pushes it out of
//! every voxel it penetrates:
//!
//! 1. **Broad phase**: every non-empty voxel inside the cylinder's bounding extents
//! 2. **Narrow phase**: closest point on each unit voxel to the cylinder's centre,
//!    kept if it lies inside the cylinder
//! 3. **Resolution**: collisions sorted by ascending overlap, each re-validated
//!    before its push-out is applied, then the velocity along its normal is cancelled
//!
//! Voxels are unit cubes centred on integer coordinates. Blocks of unloaded
//! chunks are absent and never collide.

use cgmath::{InnerSpace, Point3, Vector3};
use log::debug;
use web_time::Duration;

use crate::engine_state::{config::PhysicsParameters, voxels::world::BlockSource};

pub mod player;

use player::{forward_axis, right_axis, PlayerBody, PlayerIntent};

/// Frame deltas longer than this are clipped before integration.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Extra distance added to every push-out so a resolved contact is no
/// longer penetrating.
const CONTACT_SKIN: f32 = 1e-4;

/// Whether the solver is stepping.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SolverState {
    /// Controls not engaged; the body is left alone
    #[default]
    Idle,
    /// Fixed-rate loop active
    Stepping,
}

/// One penetrating voxel found by the narrow phase.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Collision {
    /// The voxel
    pub block_position: Point3<i32>,
    /// Closest point on the voxel to the player's centre
    pub point: Point3<f32>,
    /// Penetration depth along `normal`
    pub overlap: f32,
    /// Unit push-out direction
    pub normal: Vector3<f32>,
}

/// Fixed-timestep collision resolver for the player body.
pub struct CollisionSolver {
    params: PhysicsParameters,
    state: SolverState,
    accumulator: f32,
    candidates: Vec<Point3<i32>>,
    collisions: Vec<Collision>,
}

impl CollisionSolver {
    /// Creates an idle solver.
    pub fn new(params: PhysicsParameters) -> Self {
        CollisionSolver {
            params,
            state: SolverState::Idle,
            accumulator: 0.0,
            candidates: Vec::new(),
            collisions: Vec::new(),
        }
    }

    /// Physics parameters in use.
    pub fn params(&self) -> &PhysicsParameters {
        &self.params
    }

    /// Replaces the physics parameters. Takes effect on the next step.
    pub fn set_params(&mut self, params: PhysicsParameters) {
        self.params = params;
    }

    /// Current state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Starts stepping.
    pub fn engage(&mut self) {
        if self.state == SolverState::Idle {
            debug!("Collision solver engaged");
            self.state = SolverState::Stepping;
        }
    }

    /// Stops stepping and drops any accumulated time.
    pub fn disengage(&mut self) {
        if self.state == SolverState::Stepping {
            debug!("Collision solver disengaged");
        }
        self.state = SolverState::Idle;
        self.accumulator = 0.0;
    }

    /// Advances the simulation by `frame_delta`.
    ///
    /// # Arguments
    /// * `frame_delta` - Time since the previous frame
    /// * `body` - The player body, moved and corrected in place
    /// * `intent` - Movement and jump input for this frame
    /// * `world` - Voxel lookup
    ///
    /// # Returns
    /// The number of fixed steps run. Zero while idle.
    pub fn update<W: BlockSource + ?Sized>(
        &mut self,
        frame_delta: Duration,
        body: &mut PlayerBody,
        intent: &PlayerIntent,
        world: &W,
    ) -> usize {
        if self.state == SolverState::Idle {
            return 0;
        }

        let step_size = self.params.step_size();
        self.accumulator += frame_delta.min(MAX_FRAME_DELTA).as_secs_f32();
        let mut steps = 0;
        while self.accumulator >= step_size {
            self.step(step_size, body, intent, world);
            self.accumulator -= step_size;
            steps += 1;
        }
        steps
    }

    /// Runs one fixed step of `dt` seconds.
    fn step<W: BlockSource + ?Sized>(
        &mut self,
        dt: f32,
        body: &mut PlayerBody,
        intent: &PlayerIntent,
        world: &W,
    ) {
        let mut movement = intent.movement;
        if movement.magnitude2() > 1.0 {
            movement = movement.normalize();
        }
        body.velocity.x = movement.x * self.params.max_speed;
        body.velocity.z = movement.y * self.params.max_speed;
        if intent.jump && body.on_ground {
            body.velocity.y = self.params.jump_speed;
        }
        body.velocity.y -= self.params.gravity * dt;

        body.position += right_axis(body.yaw) * body.velocity.x * dt;
        body.position += forward_axis(body.yaw) * body.velocity.z * dt;
        body.position.y += body.velocity.y * dt;

        body.on_ground = false;
        self.detect_collisions(body, world);
        self.resolve_collisions(body);
    }

    /// Runs the broad and narrow phase for `body`.
    ///
    /// # Returns
    /// The number of penetrating voxels found.
    pub fn detect_collisions<W: BlockSource + ?Sized>(
        &mut self,
        body: &PlayerBody,
        world: &W,
    ) -> usize {
        self.broad_phase(body, world);
        self.narrow_phase(body);
        self.collisions.len()
    }

    /// Collects every non-empty voxel inside the body's bounding extents.
    fn broad_phase<W: BlockSource + ?Sized>(&mut self, body: &PlayerBody, world: &W) {
        self.candidates.clear();
        let radius = self.params.radius;
        let min_x = (body.position.x - radius).floor() as i32;
        let max_x = (body.position.x + radius).ceil() as i32;
        let min_y = (body.position.y - self.params.height).floor() as i32;
        let max_y = body.position.y.ceil() as i32;
        let min_z = (body.position.z - radius).floor() as i32;
        let max_z = (body.position.z + radius).ceil() as i32;

        for x in min_x..=max_x {
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    let solid = world
                        .get_block_at(x, y, z)
                        .is_some_and(|block| !block.is_empty());
                    if solid {
                        self.candidates.push(Point3::new(x, y, z));
                    }
                }
            }
        }
    }

    /// Keeps the candidates whose closest point lies inside the body and
    /// picks each one's minimum-translation axis.
    fn narrow_phase(&mut self, body: &PlayerBody) {
        self.collisions.clear();
        let half_height = self.params.height / 2.0;
        let center = self.center(body);

        for &block in &self.candidates {
            let point = closest_point_on_voxel(block, center);
            let dx = point.x - center.x;
            let dy = point.y - center.y;
            let dz = point.z - center.z;
            let horizontal = dx * dx + dz * dz;
            if dy.abs() >= half_height || horizontal >= self.params.radius * self.params.radius {
                continue;
            }

            let distance = horizontal.sqrt();
            let overlap_y = half_height - dy.abs();
            let overlap_xz = self.params.radius - distance;
            let collision = if overlap_y < overlap_xz || distance <= f32::EPSILON {
                let up = if dy > 0.0 { -1.0 } else { 1.0 };
                Collision {
                    block_position: block,
                    point,
                    overlap: overlap_y,
                    normal: Vector3::new(0.0, up, 0.0),
                }
            } else {
                Collision {
                    block_position: block,
                    point,
                    overlap: overlap_xz,
                    normal: Vector3::new(-dx / distance, 0.0, -dz / distance),
                }
            };
            self.collisions.push(collision);
        }
    }

    /// Pushes the body out of the collisions found by the narrow phase,
    /// smallest overlap first.
    fn resolve_collisions(&mut self, body: &mut PlayerBody) {
        self.collisions.sort_by(|a, b| a.overlap.total_cmp(&b.overlap));

        for i in 0..self.collisions.len() {
            let collision = self.collisions[i];
            if !self.point_in_player(collision.point, body) {
                continue;
            }

            body.position += collision.normal * (collision.overlap + CONTACT_SKIN);
            if collision.normal.y > 0.0 {
                body.on_ground = true;
            }

            let velocity = body.world_velocity();
            let along = velocity.dot(collision.normal);
            body.set_world_velocity(velocity - collision.normal * along);
        }
    }

    /// Whether `point` lies inside the body's cylinder.
    pub fn point_in_player(&self, point: Point3<f32>, body: &PlayerBody) -> bool {
        let center = self.center(body);
        let dx = point.x - center.x;
        let dy = point.y - center.y;
        let dz = point.z - center.z;
        dy.abs() < self.params.height / 2.0
            && dx * dx + dz * dz < self.params.radius * self.params.radius
    }

    /// Whether the unit voxel at `block` intersects the body's cylinder.
    pub fn voxel_overlaps_player(&self, block: Point3<i32>, body: &PlayerBody) -> bool {
        let point = closest_point_on_voxel(block, self.center(body));
        self.point_in_player(point, body)
    }

    fn center(&self, body: &PlayerBody) -> Point3<f32> {
        Point3::new(
            body.position.x,
            body.position.y - self.params.height / 2.0,
            body.position.z,
        )
    }
}

/// Closest point to `target` on the unit cube centred on `block`.
fn closest_point_on_voxel(block: Point3<i32>, target: Point3<f32>) -> Point3<f32> {
    Point3::new(
        target.x.clamp(block.x as f32 - 0.5, block.x as f32 + 0.5),
        target.y.clamp(block.y as f32 - 0.5, block.y as f32 + 0.5),
        target.z.clamp(block.z as f32 - 0.5, block.z as f32 + 0.5),
    )
}
