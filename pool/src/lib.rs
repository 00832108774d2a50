//! BatchPool - bounded-concurrency batch execution
//!
//! Runs many independent async operations against a fixed number of
//! cooperative workers that share one queue.
//!
//! # Core Concepts
//!
//! - **Fixed Parallelism**: at most K operations are in flight at once
//! - **Ordered Output**: results land at their input index, whatever order they finish in
//! - **Failure Policy**: per-item failures are recorded, or the first one halts dispatch
//! - **Cooperative Abort**: a progress callback can stop dispatch; in-flight work always drains
//!
//! # Modules
//!
//! - [`pool`] - The shared worker loop over a claimable queue
//! - [`scheduler`] - `TaskScheduler`, result types and abort errors

pub mod pool;
pub mod scheduler;

pub use pool::{WorkQueue, run_worker, run_workers};
pub use scheduler::{
    AbortReason, BatchAborted, DEFAULT_MAX_WORKERS, Progress, ProgressControl, SchedulerConfig, TaskOutcome,
    TaskResult, TaskScheduler, WorkItem,
};
