//! # Task System Core Traits
//!
//! This module defines the building blocks of the task system:
//! - `Task`: a unit of work executed on a worker thread
//! - `TaskResult`: the plain-data outcome of a task, applied on the main thread
//! - `TaskError`: why a task produced no result
//!
//! ## Task Lifecycle
//! 1. A `Task` is submitted via `TaskManager::submit()` and receives a `TaskHandle`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult` or a `TaskError`
//! 4. The manager hands the outcome back through `process_completed_tasks()`
//! 5. The world checks the handle is still current and calls `handle_result()`
//!
//! ## Thread Safety
//! Tasks own snapshots of everything they read. Results never touch shared chunk
//! state from the worker; all mutation happens in `handle_result()` on the
//! thread that owns the world.

use thiserror::Error;

use crate::engine_state::voxels::{terrain::GenerationError, world::World};

/// Why a task did not produce a result.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The terrain generator rejected the request.
    #[error("terrain generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The mesher could not produce geometry.
    #[error("meshing failed: {0}")]
    Meshing(String),

    /// The task panicked on its worker.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled before it ran.
    #[error("task was cancelled")]
    Cancelled,
}

/// A unit of work that can be executed on a worker thread.
///
/// # Implementation Guidelines
/// - Must be `Send` to be transferred between threads
/// - Should own all the data it reads (buffers are shared through `Arc`)
/// - Should be coarse-grained; one task covers one chunk
pub trait Task: Send {
    /// Performs the work.
    ///
    /// # Returns
    /// A boxed `TaskResult` to apply on the main thread, or the reason the work failed.
    fn process(&self) -> Result<Box<dyn TaskResult + Send>, TaskError>;
}

/// The result of a completed `Task`, applied on the main thread.
///
/// `handle_result()` is only called when the task's handle is still the current
/// job for its chunk. Stale results are dropped before they get here.
pub trait TaskResult: Send {
    /// Applies the result to the world.
    fn handle_result(self: Box<Self>, world: &mut World);
}
