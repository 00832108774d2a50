//! Per-run batch state
//!
//! Created when a run starts and consumed when it finishes; nothing here
//! outlives a single call to `TaskScheduler::run`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::pool::WorkQueue;

use super::result::{AbortReason, BatchAborted, Progress, ProgressControl, TaskResult, WorkItem};

/// Boxed progress callback
pub(crate) type ProgressFn<'a, T, R, E> = Box<dyn FnMut(&Progress<'_, T, R, E>) -> ProgressControl + Send + 'a>;

struct BatchState<'a, T, R, E> {
    /// Rows not yet dispatched, FIFO
    queue: VecDeque<WorkItem<T>>,

    /// One slot per input row; `None` until written
    results: Vec<Option<TaskResult<T, R, E>>>,

    completed: usize,
    in_flight: usize,
    peak_in_flight: usize,

    /// First fatal condition raised; blocks further claims
    fatal: Option<AbortReason>,

    on_progress: Option<ProgressFn<'a, T, R, E>>,
}

pub(crate) struct Batch<'a, T, R, E> {
    total: usize,
    break_on_item_error: bool,
    state: Mutex<BatchState<'a, T, R, E>>,
}

impl<'a, T, R, E> Batch<'a, T, R, E> {
    pub(crate) fn new(rows: Vec<T>, break_on_item_error: bool, on_progress: Option<ProgressFn<'a, T, R, E>>) -> Self {
        let total = rows.len();
        let queue = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| WorkItem { index, row })
            .collect();
        let results = std::iter::repeat_with(|| None).take(total).collect();

        Self {
            total,
            break_on_item_error,
            state: Mutex::new(BatchState {
                queue,
                results,
                completed: 0,
                in_flight: 0,
                peak_in_flight: 0,
                fatal: None,
                on_progress,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState<'a, T, R, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a finished row into its slot and report progress.
    pub(crate) fn record(&self, item: WorkItem<T>, outcome: Result<R, E>) {
        let index = item.index;
        let failed = outcome.is_err();
        let mut guard = self.lock();
        let state = &mut *guard;

        state.in_flight -= 1;
        state.completed += 1;

        if failed {
            debug!(index, "Batch::record: item failed");
            if self.break_on_item_error && state.fatal.is_none() {
                warn!(index, "Item failed with break-on-item-error set, halting dispatch");
                state.fatal = Some(AbortReason::ItemFailed { index });
            }
        }

        state.results[index] = Some(TaskResult {
            index,
            row: item.row,
            outcome: outcome.into(),
        });

        let (Some(callback), Some(latest)) = (state.on_progress.as_mut(), state.results[index].as_ref()) else {
            return;
        };
        let progress = Progress {
            total: self.total,
            completed: state.completed,
            latest,
        };
        if callback(&progress) == ProgressControl::Abort && state.fatal.is_none() {
            warn!(completed = state.completed, "Progress callback requested abort, halting dispatch");
            state.fatal = Some(AbortReason::Requested {
                completed: state.completed,
            });
        }
    }

    /// Consume the batch once every worker has exited.
    pub(crate) fn finish(self) -> Result<Vec<TaskResult<T, R, E>>, BatchAborted<T, R, E>> {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        debug!(
            total = self.total,
            completed = state.completed,
            peak_in_flight = state.peak_in_flight,
            skipped = state.queue.len(),
            "Batch::finish: called"
        );

        let mut slots = state.results;
        for item in state.queue {
            let index = item.index;
            slots[index] = Some(TaskResult::skipped(item));
        }
        let results: Vec<_> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), self.total, "every slot is written exactly once");

        match state.fatal {
            Some(reason) => Err(BatchAborted { reason, results }),
            None => Ok(results),
        }
    }
}

impl<T, R, E> WorkQueue for Batch<'_, T, R, E> {
    type Job = WorkItem<T>;

    fn claim(&self) -> Option<WorkItem<T>> {
        let mut state = self.lock();
        if state.fatal.is_some() {
            return None;
        }
        let item = state.queue.pop_front()?;
        state.in_flight += 1;
        state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        Some(item)
    }
}
