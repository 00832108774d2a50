//! Shared worker loop
//!
//! Batch runs and long-lived upload queues are both a fixed number of
//! workers repeatedly claiming a job from a queue until the queue says stop.
//! The queue decides what "claim" means (pop, flip a status, refuse after a
//! fatal error); the handler decides what to do with the job.

use std::future::Future;

use futures::future::join_all;
use tracing::debug;

/// A queue that workers claim jobs from.
///
/// `claim` is synchronous: whatever bookkeeping marks a job as taken happens
/// before the worker reaches its first await point, so no two workers can
/// ever hold the same job.
pub trait WorkQueue {
    type Job;

    /// Claim the next job. `None` ends the calling worker's loop.
    fn claim(&self) -> Option<Self::Job>;
}

/// Run one worker: claim, handle, repeat until the queue is exhausted.
///
/// Returns the number of jobs this worker handled.
pub async fn run_worker<Q, F, Fut>(queue: &Q, worker_id: usize, mut handler: F) -> usize
where
    Q: WorkQueue + ?Sized,
    F: FnMut(Q::Job) -> Fut,
    Fut: Future<Output = ()>,
{
    debug!(worker_id, "run_worker: called");
    let mut handled = 0;
    while let Some(job) = queue.claim() {
        handler(job).await;
        handled += 1;
    }
    debug!(worker_id, handled, "run_worker: no more work, exiting");
    handled
}

/// Run `count` workers concurrently on the current task.
///
/// Resolves once, when the last worker has exited. With `count == 0` it
/// resolves immediately without claiming anything.
pub async fn run_workers<Q, F, Fut>(queue: &Q, count: usize, handler: F) -> usize
where
    Q: WorkQueue + ?Sized,
    F: Fn(usize, Q::Job) -> Fut,
    Fut: Future<Output = ()>,
{
    debug!(count, "run_workers: called");
    if count == 0 {
        debug!("run_workers: zero workers, nothing to do");
        return 0;
    }

    let handler = &handler;
    let workers = (0..count).map(|worker_id| run_worker(queue, worker_id, move |job| handler(worker_id, job)));
    let handled = join_all(workers).await.into_iter().sum();

    debug!(count, handled, "run_workers: all workers exited");
    handled
}
