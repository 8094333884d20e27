//! # Task System Core Trait
//!
//! This module defines the unit of deferred work the engine schedules at idle
//! points of the frame loop.
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and queued via `TaskManager::publish_task()`
//! 2. At an idle point the manager pops it and calls `process()` on the render thread
//! 3. The task runs to completion; there is no partial or resumable work
//!
//! ## Context
//! Tasks do not hold references into the engine. They own the little data they
//! need (a chunk position, a generation epoch) and receive the mutable context
//! `C` when they run.

/// A unit of work that runs to completion against a context `C`.
///
/// # Implementation Guidelines
/// - Should own all the data it needs besides the context
/// - Should check that its work is still wanted when it finally runs; the
///   world may have changed while it was queued
pub trait Task<C> {
    /// Processes the task.
    ///
    /// # Arguments
    /// * `context` - The state the task operates on
    fn process(self: Box<Self>, context: &mut C);

    /// Short description used in log output.
    fn label(&self) -> String;
}
