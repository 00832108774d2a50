//! Result, progress and abort types for batch runs

use std::fmt;

use thiserror::Error;

/// One input row paired with its position in the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<T> {
    pub index: usize,
    pub row: T,
}

/// What happened to a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<R, E> {
    /// The operation resolved
    Success(R),

    /// The operation failed
    Failure(E),

    /// Never dispatched because the batch was aborted first
    Skipped,
}

impl<R, E> From<Result<R, E>> for TaskOutcome<R, E> {
    fn from(result: Result<R, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Output slot for one row, stored at the row's input index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult<T, R, E> {
    pub index: usize,
    pub row: T,
    pub outcome: TaskOutcome<R, E>,
}

impl<T, R, E> TaskResult<T, R, E> {
    pub(crate) fn skipped(item: WorkItem<T>) -> Self {
        Self {
            index: item.index,
            row: item.row,
            outcome: TaskOutcome::Skipped,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Skipped)
    }

    pub fn result(&self) -> Option<&R> {
        match &self.outcome {
            TaskOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match &self.outcome {
            TaskOutcome::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// `None` for skipped rows
    pub fn into_result(self) -> Option<Result<R, E>> {
        match self.outcome {
            TaskOutcome::Success(value) => Some(Ok(value)),
            TaskOutcome::Failure(err) => Some(Err(err)),
            TaskOutcome::Skipped => None,
        }
    }
}

/// Snapshot handed to the progress callback after every completion
#[derive(Debug)]
pub struct Progress<'r, T, R, E> {
    pub total: usize,
    pub completed: usize,
    pub latest: &'r TaskResult<T, R, E>,
}

/// Returned by the progress callback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressControl {
    #[default]
    Continue,

    /// Stop dispatching new rows; rows already in flight still finish
    Abort,
}

impl From<bool> for ProgressControl {
    fn from(abort: bool) -> Self {
        if abort { Self::Abort } else { Self::Continue }
    }
}

impl From<()> for ProgressControl {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

/// Why a batch stopped dispatching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("item {index} failed and break-on-item-error is set")]
    ItemFailed { index: usize },

    #[error("abort requested by progress callback after {completed} completions")]
    Requested { completed: usize },
}

/// A batch that hit a fatal condition.
///
/// `results` is still full length and in input order: rows that ran carry
/// their outcome, rows that were never dispatched are `Skipped`.
pub struct BatchAborted<T, R, E> {
    pub reason: AbortReason,
    pub results: Vec<TaskResult<T, R, E>>,
}

impl<T, R, E> BatchAborted<T, R, E> {
    /// The item error that triggered the abort, if an item failure did
    pub fn error(&self) -> Option<&E> {
        match self.reason {
            AbortReason::ItemFailed { index } => self.results.get(index).and_then(TaskResult::error),
            AbortReason::Requested { .. } => None,
        }
    }

    /// Number of rows that were dispatched and finished
    pub fn attempted(&self) -> usize {
        self.results.iter().filter(|r| !r.is_skipped()).count()
    }

    pub fn into_results(self) -> Vec<TaskResult<T, R, E>> {
        self.results
    }
}

impl<T, R, E> fmt::Debug for BatchAborted<T, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchAborted")
            .field("reason", &self.reason)
            .field("total", &self.results.len())
            .field("attempted", &self.attempted())
            .finish()
    }
}

impl<T, R, E> fmt::Display for BatchAborted<T, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch aborted: {}", self.reason)
    }
}

impl<T, R, E> std::error::Error for BatchAborted<T, R, E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, outcome: TaskOutcome<u32, String>) -> TaskResult<u32, u32, String> {
        TaskResult {
            index,
            row: index as u32,
            outcome,
        }
    }

    #[test]
    fn test_accessors_match_outcome() {
        let ok = result(0, TaskOutcome::Success(7));
        assert!(ok.success());
        assert_eq!(ok.result(), Some(&7));
        assert_eq!(ok.error(), None);

        let failed = result(1, TaskOutcome::Failure("boom".to_string()));
        assert!(!failed.success());
        assert_eq!(failed.result(), None);
        assert_eq!(failed.error().map(String::as_str), Some("boom"));

        let skipped = result(2, TaskOutcome::Skipped);
        assert!(skipped.is_skipped());
        assert!(skipped.into_result().is_none());
    }

    #[test]
    fn test_progress_control_from_bool() {
        assert_eq!(ProgressControl::from(true), ProgressControl::Abort);
        assert_eq!(ProgressControl::from(false), ProgressControl::Continue);
        assert_eq!(ProgressControl::from(()), ProgressControl::Continue);
    }

    #[test]
    fn test_batch_aborted_exposes_triggering_error() {
        let aborted = BatchAborted {
            reason: AbortReason::ItemFailed { index: 1 },
            results: vec![
                result(0, TaskOutcome::Success(0)),
                result(1, TaskOutcome::Failure("disk full".to_string())),
                result(2, TaskOutcome::Skipped),
            ],
        };

        assert_eq!(aborted.error().map(String::as_str), Some("disk full"));
        assert_eq!(aborted.attempted(), 2);
        assert!(aborted.to_string().contains("item 1 failed"));
    }

    #[test]
    fn test_requested_abort_has_no_item_error() {
        let aborted: BatchAborted<u32, u32, String> = BatchAborted {
            reason: AbortReason::Requested { completed: 2 },
            results: vec![],
        };
        assert!(aborted.error().is_none());
        assert!(aborted.to_string().contains("progress callback"));
    }
}
