//! # Task Management System
//!
//! This module runs terrain generation and meshing work off the main line of
//! control. Workers only ever return plain data; the world applies it on the
//! thread that owns it, so chunk storage needs no locks.
//!
//! ## Architecture Overview
//! - `TaskManager`: owns two independently sized worker pools (terrain, mesh),
//!   hands out `TaskHandle`s and tracks the one outstanding job per chunk and kind
//! - `WorkerPool`: a set of `TaskChannel`s plus a FIFO of tasks waiting for a worker
//! - `TaskChannel`: the channel pair between the main thread and one worker thread
//!
//! ## Task Lifecycle
//! 1. `TaskManager::submit()` returns a handle. A second submit for the same
//!    chunk and kind while the first is outstanding is coalesced onto it.
//! 2. The pool hands the task to a free worker (round-robin) or queues it.
//! 3. The worker runs the task inside `catch_unwind`; a panic becomes
//!    `TaskError::Panicked` rather than killing the worker.
//! 4. `process_completed_tasks()` drains finished work. Results for cancelled
//!    handles are dropped here.
//!
//! ## Inline Pools
//! A pool created with zero workers runs its queue on the calling thread during
//! `process_queued_tasks()`. Results are still delivered through
//! `process_completed_tasks()`, so callers see the same ordering either way.
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut task_manager = TaskManager::new(1, 3);
//! let handle = task_manager.submit(TaskKind::Terrain, coord, Box::new(task));
//!
//! // In the main loop:
//! for completion in task_manager.process_completed_tasks() { /* apply */ }
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use task::{Task, TaskError, TaskResult};

use crate::engine_state::voxels::chunk::ChunkCoord;

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Kept at 1 so a busy worker never holds work another idle worker could take.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// Which pool a task runs on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Terrain generation for one chunk.
    Terrain,
    /// Greedy meshing for one chunk.
    Mesh,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Terrain => write!(f, "terrain"),
            TaskKind::Mesh => write!(f, "mesh"),
        }
    }
}

/// Identifies one submitted task.
///
/// Handles are cheap to clone. Cancellation is shared between clones: once any
/// clone is cancelled, every clone reports `is_cancelled()`.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: u64,
    kind: TaskKind,
    coord: ChunkCoord,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Unique id of the task within its manager.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pool the task was submitted to.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Chunk the task works on.
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Whether the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TaskHandle {}

/// What a finished task produced.
pub type TaskOutcome = Result<Box<dyn TaskResult + Send>, TaskError>;

/// A finished, non-cancelled task returned by `process_completed_tasks()`.
pub struct TaskCompletion {
    /// The handle the task was submitted under
    pub handle: TaskHandle,
    /// The result, or why there is none
    pub outcome: TaskOutcome,
}

/// Counters kept by the manager.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Terrain tasks accepted (coalesced submits excluded)
    pub submitted_terrain: u64,
    /// Mesh tasks accepted (coalesced submits excluded)
    pub submitted_mesh: u64,
    /// Submits folded into an outstanding task
    pub coalesced: u64,
    /// Handles cancelled
    pub cancelled: u64,
    /// Results dropped because their handle was cancelled
    pub discarded: u64,
    /// Completions that carried an error
    pub failed: u64,
}

struct QueuedTask {
    handle: TaskHandle,
    task: Box<dyn Task + Send>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs one task, turning a cancellation or a panic into a `TaskError`.
fn run_task(queued: QueuedTask) -> (TaskHandle, TaskOutcome) {
    let QueuedTask { handle, task } = queued;
    if handle.is_cancelled() {
        return (handle, Err(TaskError::Cancelled));
    }
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
        Ok(outcome) => outcome,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    };
    (handle, outcome)
}

/// The channel pair between the main thread and one worker thread.
///
/// The worker exits when `task_sender` is dropped.
struct TaskChannel {
    task_sender: Sender<QueuedTask>,
    result_receiver: Receiver<(TaskHandle, TaskOutcome)>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

impl TaskChannel {
    fn spawn(kind: TaskKind, index: usize) -> std::io::Result<Self> {
        let (task_tx, task_rx) = channel::<QueuedTask>();
        let (result_tx, result_rx) = channel::<(TaskHandle, TaskOutcome)>();

        let task_closure = move || {
            while let Ok(queued) = task_rx.recv() {
                if result_tx.send(run_task(queued)).is_err() {
                    break;
                }
            }
        };

        let worker = thread::Builder::new()
            .name(format!("{kind}-worker-{index}"))
            .spawn(task_closure)?;

        Ok(TaskChannel {
            task_sender: task_tx,
            result_receiver: result_rx,
            num_tasks_in_flight: 0,
            _worker: worker,
        })
    }
}

/// Worker threads serving one task kind.
struct WorkerPool {
    kind: TaskKind,
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<QueuedTask>,
    current_channel: usize,
    inline_results: Vec<(TaskHandle, TaskOutcome)>,
}

impl WorkerPool {
    fn new(kind: TaskKind, num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            match TaskChannel::spawn(kind, index) {
                Ok(task_channel) => channels.push(task_channel),
                Err(error) => warn!("Failed to spawn {kind} worker {index}: {error}"),
            }
        }

        if channels.is_empty() {
            info!("{kind} pool runs inline on the calling thread");
        } else {
            info!(
                "{kind} pool started with {} workers (available parallelism: {:?})",
                channels.len(),
                thread::available_parallelism()
            );
        }

        WorkerPool {
            kind,
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            inline_results: Vec::new(),
        }
    }

    /// Sends a task to a specific worker, returning it if the worker has gone away.
    fn try_send_task(&mut self, queued: QueuedTask, channel_idx: usize) -> Result<(), QueuedTask> {
        match self.channels[channel_idx].task_sender.send(queued) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(returned) => Err(returned.0),
        }
    }

    /// Finds a worker below `MAX_TASKS_IN_FLIGHT`, round-robin from the last one used.
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|offset| (self.current_channel + offset) % len)
            .find(|&index| self.channels[index].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Starts a task now if a worker is free, otherwise queues it.
    fn publish(&mut self, queued: QueuedTask) {
        let Some(channel_idx) = self.find_available_channel() else {
            self.queued_tasks.push_back(queued);
            return;
        };
        match self.try_send_task(queued, channel_idx) {
            Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
            Err(queued) => {
                warn!("{} worker {channel_idx} is disconnected", self.kind);
                self.queued_tasks.push_back(queued);
            }
        }
    }

    /// Moves queued tasks onto free workers, or runs them here when the pool is inline.
    fn process_queued_tasks(&mut self) {
        if self.channels.is_empty() {
            while let Some(queued) = self.queued_tasks.pop_front() {
                let result = run_task(queued);
                self.inline_results.push(result);
            }
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(queued) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(queued, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(queued) => {
                    self.queued_tasks.push_front(queued);
                    break;
                }
            }
        }
    }

    fn drain_results(&mut self, finished: &mut Vec<(TaskHandle, TaskOutcome)>) {
        finished.append(&mut self.inline_results);
        for task_channel in &mut self.channels {
            while let Ok(result) = task_channel.result_receiver.try_recv() {
                task_channel.num_tasks_in_flight -= 1;
                finished.push(result);
            }
        }
    }

    /// Drops a task that has not reached a worker yet.
    fn remove_queued(&mut self, id: u64) -> bool {
        let before = self.queued_tasks.len();
        self.queued_tasks.retain(|queued| queued.handle.id != id);
        self.queued_tasks.len() != before
    }

    fn in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|task_channel| task_channel.num_tasks_in_flight)
            .sum()
    }
}

/// Schedules terrain and mesh tasks onto bounded worker pools.
pub struct TaskManager {
    terrain_pool: WorkerPool,
    mesh_pool: WorkerPool,
    outstanding: HashMap<(TaskKind, ChunkCoord), TaskHandle>,
    next_task_id: u64,
    stats: SchedulerStats,
}

impl TaskManager {
    /// Creates the two pools.
    ///
    /// # Arguments
    /// * `terrain_workers` - Threads serving terrain tasks; 0 runs them inline
    /// * `mesh_workers` - Threads serving mesh tasks; 0 runs them inline
    pub fn new(terrain_workers: usize, mesh_workers: usize) -> Self {
        TaskManager {
            terrain_pool: WorkerPool::new(TaskKind::Terrain, terrain_workers),
            mesh_pool: WorkerPool::new(TaskKind::Mesh, mesh_workers),
            outstanding: HashMap::new(),
            next_task_id: 0,
            stats: SchedulerStats::default(),
        }
    }

    fn pool_mut(&mut self, kind: TaskKind) -> &mut WorkerPool {
        match kind {
            TaskKind::Terrain => &mut self.terrain_pool,
            TaskKind::Mesh => &mut self.mesh_pool,
        }
    }

    /// Submits a task for a chunk.
    ///
    /// If a task of the same kind is already outstanding for `coord`, `task` is
    /// dropped and the existing handle is returned.
    pub fn submit(
        &mut self,
        kind: TaskKind,
        coord: ChunkCoord,
        task: Box<dyn Task + Send>,
    ) -> TaskHandle {
        if let Some(existing) = self.outstanding.get(&(kind, coord)) {
            self.stats.coalesced += 1;
            debug!("Coalesced {kind} task for chunk {coord} onto task {}", existing.id);
            return existing.clone();
        }

        let handle = TaskHandle {
            id: self.next_task_id,
            kind,
            coord,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        self.next_task_id += 1;
        match kind {
            TaskKind::Terrain => self.stats.submitted_terrain += 1,
            TaskKind::Mesh => self.stats.submitted_mesh += 1,
        }

        self.outstanding.insert((kind, coord), handle.clone());
        self.pool_mut(kind).publish(QueuedTask {
            handle: handle.clone(),
            task,
        });
        handle
    }

    /// Cancels a task.
    ///
    /// A queued task is dropped without running. A running task finishes, but its
    /// result is discarded. Returns `false` if the handle was already cancelled.
    pub fn cancel(&mut self, handle: &TaskHandle) -> bool {
        if handle.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stats.cancelled += 1;

        let key = (handle.kind, handle.coord);
        if self
            .outstanding
            .get(&key)
            .is_some_and(|current| current.id == handle.id)
        {
            self.outstanding.remove(&key);
        }
        if self.pool_mut(handle.kind).remove_queued(handle.id) {
            debug!(
                "Dropped queued {} task {} for chunk {}",
                handle.kind, handle.id, handle.coord
            );
        }
        true
    }

    /// Whether a task of `kind` is outstanding for `coord`.
    pub fn is_outstanding(&self, kind: TaskKind, coord: ChunkCoord) -> bool {
        self.outstanding.contains_key(&(kind, coord))
    }

    /// Hands queued tasks to free workers. Inline pools run their queue here.
    pub fn process_queued_tasks(&mut self) {
        self.terrain_pool.process_queued_tasks();
        self.mesh_pool.process_queued_tasks();
    }

    /// Collects every finished task.
    ///
    /// Results whose handle was cancelled are dropped and counted in
    /// `SchedulerStats::discarded`.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskCompletion> {
        let mut finished = Vec::new();
        self.terrain_pool.drain_results(&mut finished);
        self.mesh_pool.drain_results(&mut finished);

        let mut completions = Vec::with_capacity(finished.len());
        for (handle, outcome) in finished {
            if handle.is_cancelled() {
                self.stats.discarded += 1;
                debug!(
                    "Discarded {} task {} for chunk {}",
                    handle.kind, handle.id, handle.coord
                );
                continue;
            }

            let key = (handle.kind, handle.coord);
            if self
                .outstanding
                .get(&key)
                .is_some_and(|current| current.id == handle.id)
            {
                self.outstanding.remove(&key);
            }
            if outcome.is_err() {
                self.stats.failed += 1;
            }
            completions.push(TaskCompletion { handle, outcome });
        }
        completions
    }

    /// Whether no task is outstanding.
    pub fn is_idle(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Tasks currently running on worker threads, cancelled ones included.
    pub fn in_flight(&self) -> usize {
        self.terrain_pool.in_flight() + self.mesh_pool.in_flight()
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.terrain_pool.queued_tasks.len() + self.mesh_pool.queued_tasks.len()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}
