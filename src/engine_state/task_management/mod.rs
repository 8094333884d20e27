//! # Task Management System
//!
//! This module provides the cooperative scheduler that defers expensive work,
//! chiefly chunk generation, to idle points of the frame loop.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: FIFO queue of pending tasks plus their deadlines
//! - `Task`: A unit of work that runs to completion against a context
//!
//! Everything runs on the single render thread. Each queued task carries a
//! deadline (`enqueued_at + timeout`). `process_queued_tasks()` is called
//! once per frame with an idle budget:
//! - tasks run while the budget lasts
//! - tasks past their deadline run regardless of the budget, so no task
//!   starves behind a string of busy frames
//! - at least one task runs per call when any is queued
//!
//! ## Example Usage
//! ```rust
//! use voxel_world::engine_state::task_management::{task::Task, TaskManager};
//! use web_time::Duration;
//!
//! struct Push(u32);
//!
//! impl Task<Vec<u32>> for Push {
//!     fn process(self: Box<Self>, context: &mut Vec<u32>) {
//!         context.push(self.0);
//!     }
//!
//!     fn label(&self) -> String {
//!         format!("push {}", self.0)
//!     }
//! }
//!
//! let mut task_manager = TaskManager::new(Duration::from_millis(200));
//! task_manager.publish_task(Box::new(Push(1)));
//! task_manager.publish_task(Box::new(Push(2)));
//!
//! // In the frame loop:
//! let mut log = Vec::new();
//! task_manager.process_queued_tasks(&mut log, Duration::from_millis(4));
//! assert_eq!(log[0], 1);
//! ```

pub mod task;

use std::collections::VecDeque;

use log::trace;
use task::Task;
use web_time::{Duration, Instant};

/// A task waiting in the queue.
struct QueuedTask<C> {
    task: Box<dyn Task<C>>,
    deadline: Instant,
}

/// Cooperative FIFO scheduler for deferred work.
///
/// # Type Parameters
/// - `C`: The context every task runs against
pub struct TaskManager<C> {
    queued_tasks: VecDeque<QueuedTask<C>>,
    timeout: Duration,
}

impl<C> TaskManager<C> {
    /// Creates an empty manager.
    ///
    /// # Arguments
    /// * `timeout` - Longest a task may wait before it runs regardless of the idle budget
    pub fn new(timeout: Duration) -> Self {
        TaskManager {
            queued_tasks: VecDeque::new(),
            timeout,
        }
    }

    /// Queues a task at the back of the queue.
    pub fn publish_task(&mut self, task: Box<dyn Task<C>>) {
        self.publish_task_at(task, Instant::now());
    }

    /// Queues a task as if it had been published at `now`.
    pub fn publish_task_at(&mut self, task: Box<dyn Task<C>>, now: Instant) {
        self.queued_tasks.push_back(QueuedTask {
            task,
            deadline: now + self.timeout,
        });
    }

    /// Number of tasks waiting.
    pub fn len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Whether no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.queued_tasks.is_empty()
    }

    /// Drops every queued task.
    pub fn clear(&mut self) {
        self.queued_tasks.clear();
    }

    /// Runs queued tasks in FIFO order at an idle point.
    ///
    /// # Arguments
    /// * `context` - Passed to every task that runs
    /// * `idle_budget` - How long this call may keep starting tasks
    ///
    /// # Returns
    /// The number of tasks that ran.
    pub fn process_queued_tasks(&mut self, context: &mut C, idle_budget: Duration) -> usize {
        let start = Instant::now();
        self.process_queued_tasks_with_clock(context, idle_budget, start, Instant::now)
    }

    /// `process_queued_tasks` with an explicit clock, so deadlines can be
    /// tested without sleeping.
    pub fn process_queued_tasks_with_clock(
        &mut self,
        context: &mut C,
        idle_budget: Duration,
        start: Instant,
        mut clock: impl FnMut() -> Instant,
    ) -> usize {
        let mut processed = 0;
        loop {
            let now = clock();
            let Some(front) = self.queued_tasks.front() else {
                break;
            };
            let within_budget = now.saturating_duration_since(start) < idle_budget;
            let overdue = now >= front.deadline;
            if processed > 0 && !within_budget && !overdue {
                break;
            }
            let Some(queued) = self.queued_tasks.pop_front() else {
                break;
            };
            trace!("Running task: {}", queued.task.label());
            queued.task.process(context);
            processed += 1;
        }
        processed
    }
}
