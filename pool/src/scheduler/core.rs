//! TaskScheduler implementation

use std::future::Future;

use tracing::{debug, info};

use crate::pool::run_workers;

use super::batch::{Batch, ProgressFn};
use super::config::SchedulerConfig;
use super::result::{BatchAborted, Progress, ProgressControl, TaskResult, WorkItem};

/// Runs one async operation over every row of a batch with at most
/// `max_workers` invocations in flight.
///
/// Results come back in input order regardless of completion order. With
/// `break_on_item_error` unset, failures are recorded per row and the batch
/// always resolves; with it set, the first failure stops new dispatch and
/// the run returns [`BatchAborted`] once in-flight rows have drained. A
/// progress callback returning [`ProgressControl::Abort`] has the same effect.
///
/// `run` needs `T: Clone`: the operation takes its row by value, so the
/// returned future can own it, and every [`TaskResult`] still carries the
/// row it was produced from. Wrap rows in `Arc` when cloning is expensive
/// or impossible.
pub struct TaskScheduler<'a, T, R, E> {
    config: SchedulerConfig,
    on_progress: Option<ProgressFn<'a, T, R, E>>,
}

impl<T, R, E> Default for TaskScheduler<'_, T, R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, R, E> TaskScheduler<'a, T, R, E> {
    /// Create a scheduler with default options (10 workers, failures non-fatal)
    pub fn new() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            config: config.clone(),
            on_progress: None,
        }
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self
    }

    pub fn break_on_item_error(mut self, enabled: bool) -> Self {
        self.config.break_on_item_error = enabled;
        self
    }

    /// Called synchronously after every row completes, in completion order.
    ///
    /// The callback may return `()`, a `bool` (true aborts), or a
    /// [`ProgressControl`].
    pub fn on_progress<F, C>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Progress<'_, T, R, E>) -> C + Send + 'a,
        C: Into<ProgressControl>,
    {
        let boxed: ProgressFn<'a, T, R, E> = Box::new(move |progress| callback(progress).into());
        self.on_progress = Some(boxed);
        self
    }

    /// Run `operation` over `rows`.
    pub async fn run<F, Fut>(self, rows: Vec<T>, operation: F) -> Result<Vec<TaskResult<T, R, E>>, BatchAborted<T, R, E>>
    where
        T: Clone,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let total = rows.len();
        debug!(
            total,
            max_workers = self.config.max_workers,
            break_on_item_error = self.config.break_on_item_error,
            "TaskScheduler::run: called"
        );

        // No workers means nothing would ever signal completion
        if rows.is_empty() {
            debug!("TaskScheduler::run: empty batch, resolving immediately");
            return Ok(Vec::new());
        }

        let workers = self.config.effective_workers(total);
        let batch = Batch::new(rows, self.config.break_on_item_error, self.on_progress);

        let batch_ref = &batch;
        let operation = &operation;
        run_workers(&batch, workers, move |worker_id, item: WorkItem<T>| async move {
            debug!(worker_id, index = item.index, "TaskScheduler::run: dispatching row");
            let outcome = operation(item.row.clone()).await;
            batch_ref.record(item, outcome);
        })
        .await;

        let finished = batch.finish();
        match &finished {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.success()).count();
                info!(total, workers, failed, "Batch complete");
            }
            Err(aborted) => {
                info!(total, workers, attempted = aborted.attempted(), reason = %aborted.reason, "Batch aborted");
            }
        }
        finished
    }
}
