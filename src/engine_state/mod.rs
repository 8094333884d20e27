//! # Engine State Module
//!
//! The core engine module that owns the voxel world and drives it once per
//! rendered frame.
//!
//! ## Key Components
//!
//! * `EngineState` - The per-frame façade the host talks to
//! * `config` - Parameter snapshots supplied by the host's UI layer
//! * `noise` - Seeded noise fields every terrain layer is built from
//! * `terrain` - Height, biome, resource and vegetation decisions per column
//! * `voxels` - Blocks, chunks, the world manager and the edit log
//! * `task_management` - Cooperative idle-time scheduler for chunk generation
//! * `physics` - Fixed-timestep player-versus-voxel collision
//!
//! ## Frame Order
//!
//! `EngineState::update` runs, in order:
//!
//! 1. Physics: fixed steps for the elapsed frame time
//! 2. The edit path: a raycast from the eye and a placement or removal on the
//!    rising edge of the primary action
//! 3. Streaming: chunks entering the load radius are registered and queued,
//!    chunks leaving it are dropped
//! 4. Idle generation: queued chunk generation within the idle budget
//! 5. A debounced flush of the edit log
//!
//! Everything runs on the thread that calls `update`; chunk handles are not
//! `Send`.

use cgmath::{Point2, Point3};
use log::{debug, info};
use web_time::{Duration, Instant};

use config::{PhysicsParameters, TerrainParameters, WorldConfig};
use physics::{
    player::{PlayerBody, PlayerIntent, PlayerView},
    CollisionSolver, SolverState,
};
use task_management::TaskManager;
use voxels::{
    edits::{EditStorage, WorldEditsStore},
    tasks::chunk_generation_task::ChunkGenerationTask,
    world::{RaycastHit, WorldManager},
};

pub mod config;
pub mod noise;
pub mod physics;
pub mod task_management;
pub mod terrain;
pub mod voxels;

/// How far the primary action reaches, in blocks.
pub const REACH: f32 = 8.0;

/// Idle time granted to chunk generation each frame.
pub const IDLE_BUDGET: Duration = Duration::from_millis(4);

/// Longest a queued chunk waits before it generates regardless of the budget.
pub const GENERATION_TIMEOUT: Duration = Duration::from_millis(200);

/// What one call to `EngineState::update` did.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed physics steps run
    pub physics_steps: usize,
    /// Chunk generation tasks run
    pub tasks_run: usize,
    /// The block the primary action hit, if any
    pub target: Option<RaycastHit>,
    /// Whether the primary action changed a block
    pub edited: bool,
}

/// The engine: world, scheduler, physics and player.
///
/// # Examples
///
/// ```
/// use voxel_world::engine_state::{
///     config::WorldConfig,
///     physics::player::{PlayerIntent, PlayerView},
///     voxels::edits::MemoryEditStorage,
///     EngineState,
/// };
/// use web_time::Duration;
///
/// let mut engine = EngineState::new(WorldConfig::default(), Box::new(MemoryEditStorage::new()))?;
/// engine.engage_controls();
///
/// // Main frame loop
/// for _ in 0..3 {
///     engine.update(&PlayerIntent::default(), PlayerView::default(), Duration::from_millis(16));
/// }
/// engine.shutdown();
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct EngineState {
    config: WorldConfig,
    world: WorldManager,
    task_manager: TaskManager<WorldManager>,
    solver: CollisionSolver,
    body: PlayerBody,
    /// Chunk the player stood in when streaming last ran
    current_player_chunk: Option<Point2<i32>>,
}

impl EngineState {
    /// Creates an engine with no chunks loaded and the player above the
    /// surface at the origin.
    ///
    /// # Arguments
    /// * `config` - Validated before anything is built
    /// * `storage` - Backend the edit log loads from and flushes to
    ///
    /// # Returns
    /// An error when the configuration is malformed.
    pub fn new(config: WorldConfig, storage: Box<dyn EditStorage>) -> anyhow::Result<Self> {
        config.validate()?;

        let world = WorldManager::new(config.size, config.terrain, WorldEditsStore::new(storage));
        let spawn = spawn_position(&world, &config.physics);
        info!(
            "Engine created: chunk {}x{}, seed {}, spawn {:?}",
            config.size.width, config.size.height, config.terrain.seed, spawn
        );

        Ok(EngineState {
            config,
            world,
            task_manager: TaskManager::new(GENERATION_TIMEOUT),
            solver: CollisionSolver::new(config.physics),
            body: PlayerBody::new(spawn),
            current_player_chunk: None,
        })
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The voxel world.
    pub fn world(&self) -> &WorldManager {
        &self.world
    }

    /// The voxel world, for hosts that edit it directly.
    pub fn world_mut(&mut self) -> &mut WorldManager {
        &mut self.world
    }

    /// The player body.
    pub fn body(&self) -> &PlayerBody {
        &self.body
    }

    /// The player body, for teleports and respawns.
    pub fn body_mut(&mut self) -> &mut PlayerBody {
        &mut self.body
    }

    /// Whether physics is stepping.
    pub fn solver_state(&self) -> SolverState {
        self.solver.state()
    }

    /// Number of chunks waiting to generate.
    pub fn pending_chunks(&self) -> usize {
        self.task_manager.len()
    }

    /// Starts physics, when the host engages pointer controls.
    pub fn engage_controls(&mut self) {
        self.solver.engage();
    }

    /// Stops physics.
    pub fn disengage_controls(&mut self) {
        self.solver.disengage();
    }

    /// Advances the engine by one rendered frame.
    ///
    /// # Arguments
    /// * `intent` - Input for this frame
    /// * `view` - Orientation of the camera
    /// * `frame_delta` - Time since the previous frame
    pub fn update(
        &mut self,
        intent: &PlayerIntent,
        view: PlayerView,
        frame_delta: Duration,
    ) -> FrameReport {
        let mut report = FrameReport::default();

        self.body.yaw = view.yaw;
        report.physics_steps = self
            .solver
            .update(frame_delta, &mut self.body, intent, &self.world);

        if intent.primary_action {
            report.target = self
                .world
                .raycast(self.body.position, view.direction(), REACH);
            if let Some(hit) = report.target {
                report.edited = self.apply_primary_action(hit, intent);
            }
        }

        self.stream_chunks();
        report.tasks_run = self
            .task_manager
            .process_queued_tasks(&mut self.world, IDLE_BUDGET);
        self.world.edits_mut().flush_if_due(Instant::now());

        report
    }

    /// Places the selected block against `hit`, or removes `hit` when no
    /// block is selected.
    fn apply_primary_action(&mut self, hit: RaycastHit, intent: &PlayerIntent) -> bool {
        match intent.selected_block {
            Some(block_type) => {
                let place = hit.place;
                if place == hit.block || self.solver.voxel_overlaps_player(place, &self.body) {
                    return false;
                }
                self.world.add_block_at(place.x, place.y, place.z, block_type)
            }
            None => self
                .world
                .remove_block_at(hit.block.x, hit.block.y, hit.block.z),
        }
    }

    /// Registers and queues the chunks around the player and drops the
    /// distant ones. Only does work when the player changed chunk.
    fn stream_chunks(&mut self) {
        let x = (self.body.position.x + 0.5).floor() as i32;
        let z = (self.body.position.z + 0.5).floor() as i32;
        let center = self.world.get_chunk_coords(x, z);
        if self.current_player_chunk == Some(center) {
            return;
        }
        self.current_player_chunk = Some(center);

        let radius = self.config.load_radius;
        let epoch = self.world.epoch();
        let missing = self.world.chunks_to_load(center, radius);
        for position in &missing {
            self.world.create_chunk(position.x, position.y);
            self.task_manager
                .publish_task(Box::new(ChunkGenerationTask::new(*position, epoch)));
        }
        let unloaded = self.world.unload_distant_chunks(center, radius);
        debug!(
            "Player entered chunk ({}, {}): queued {}, unloaded {}",
            center.x,
            center.y,
            missing.len(),
            unloaded
        );
    }

    /// Runs queued chunk generation until the queue is empty.
    ///
    /// # Returns
    /// The number of tasks run.
    pub fn generate_pending(&mut self) -> usize {
        let mut total = 0;
        while !self.task_manager.is_empty() {
            total += self
                .task_manager
                .process_queued_tasks(&mut self.world, Duration::MAX);
        }
        total
    }

    /// Replaces the terrain parameters and queues every registered chunk for
    /// regeneration. User edits survive.
    ///
    /// # Returns
    /// An error, leaving the engine untouched, when `params` is malformed.
    pub fn set_terrain_parameters(&mut self, params: TerrainParameters) -> anyhow::Result<()> {
        params.validate()?;
        self.config.terrain = params;

        self.task_manager.clear();
        let positions = self.world.set_terrain_parameters(params);
        let epoch = self.world.epoch();
        for position in &positions {
            self.task_manager
                .publish_task(Box::new(ChunkGenerationTask::new(*position, epoch)));
        }
        debug!("Queued {} chunks for regeneration", positions.len());
        Ok(())
    }

    /// Replaces the physics parameters.
    pub fn set_physics_parameters(&mut self, params: PhysicsParameters) -> anyhow::Result<()> {
        params.validate()?;
        self.config.physics = params;
        self.solver.set_params(params);
        Ok(())
    }

    /// Forces the edit log to storage.
    pub fn shutdown(&mut self) {
        info!("Engine shutting down");
        self.world.edits_mut().flush();
    }
}

/// Eye position a little above the surface at the world origin.
fn spawn_position(world: &WorldManager, physics: &PhysicsParameters) -> Point3<f32> {
    let surface = world.sampler().raw_height(0, 0);
    Point3::new(0.0, surface as f32 + 0.5 + physics.height + 1.0, 0.0)
}
