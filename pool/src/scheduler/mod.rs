//! Batch scheduler
//!
//! Runs an operation over a fixed batch of rows with bounded concurrency,
//! input-ordered results and a configurable failure policy.

mod batch;
mod config;
mod core;
mod result;

pub use config::{DEFAULT_MAX_WORKERS, SchedulerConfig};
pub use self::core::TaskScheduler;
pub use result::{AbortReason, BatchAborted, Progress, ProgressControl, TaskOutcome, TaskResult, WorkItem};
