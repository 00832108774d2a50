//! Shared pipeline state and the claim step
//!
//! Every mutation happens inside a short critical section on a std mutex
//! that is never held across an await. Claiming flips an item to
//! `Uploading` under that lock, so a worker owns its item before it ever
//! suspends.

use std::sync::{Mutex, MutexGuard, PoisonError};

use batchpool::WorkQueue;
use tokio::sync::Notify;
use tracing::debug;

use crate::domain::{ItemId, Photo, UploadItem, UploadStatus};
use crate::events::{EventBus, UploadEvent};
use crate::store::UploadContext;

use super::config::PipelineConfig;

pub(crate) struct PipelineState {
    /// Items in the order they were enqueued
    pub(crate) items: Vec<UploadItem>,

    /// Workers started and not yet exited (including ones still staggering)
    pub(crate) active_workers: usize,

    next_worker_id: usize,
}

impl PipelineState {
    pub(crate) fn find_mut(&mut self, id: &ItemId) -> Option<&mut UploadItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    pub(crate) fn count(&self, status: UploadStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }
}

/// What a worker takes away from a claim
pub(crate) struct UploadJob {
    pub(crate) id: ItemId,
    pub(crate) photo: Photo,
}

pub(crate) struct Shared {
    pub(crate) config: PipelineConfig,
    pub(crate) ctx: UploadContext,
    pub(crate) events: EventBus,
    state: Mutex<PipelineState>,
    idle: Notify,
}

impl Shared {
    pub(crate) fn new(config: PipelineConfig, ctx: UploadContext) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            config,
            ctx,
            events,
            state: Mutex::new(PipelineState {
                items: Vec::new(),
                active_workers: 0,
                next_worker_id: 0,
            }),
            idle: Notify::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve worker slots up to the configured pool size.
    ///
    /// Never reserves more workers than there are queued items; a pool size of
    /// zero is treated as one. Returns the first worker id and the number of
    /// slots reserved.
    pub(crate) fn reserve_workers(&self) -> (usize, usize) {
        let mut state = self.lock();
        let queued = state.count(UploadStatus::Queued);
        let missing = self.config.workers.max(1).saturating_sub(state.active_workers).min(queued);

        let first_id = state.next_worker_id;
        state.next_worker_id += missing;
        state.active_workers += missing;
        debug!(
            queued,
            missing,
            active = state.active_workers,
            "Shared::reserve_workers: reserved"
        );
        (first_id, missing)
    }

    pub(crate) fn active_workers(&self) -> usize {
        self.lock().active_workers
    }

    /// Release a worker slot; wakes idle waiters when the last one goes.
    pub(crate) fn worker_exited(&self, state: &mut PipelineState) {
        state.active_workers = state.active_workers.saturating_sub(1);
        if state.active_workers == 0 {
            debug!("Shared::worker_exited: last worker exited, pipeline idle");
            self.idle.notify_waiters();
        }
    }

    /// Resolves once no worker is active
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the two is not lost
            notified.as_mut().enable();
            if self.active_workers() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl WorkQueue for Shared {
    type Job = UploadJob;

    fn claim(&self) -> Option<UploadJob> {
        let mut state = self.lock();

        let job = if self.ctx.target.is_ready() {
            state
                .items
                .iter_mut()
                .find(|item| item.status == UploadStatus::Queued)
                .map(|item| {
                    item.status = UploadStatus::Uploading;
                    UploadJob {
                        id: item.id.clone(),
                        photo: item.photo.clone(),
                    }
                })
        } else {
            debug!("Shared::claim: upload target not ready");
            None
        };

        match &job {
            Some(job) => {
                debug!(id = %job.id, filename = %job.photo.filename, "Shared::claim: claimed item");
                self.events.emit(UploadEvent::StatusChanged {
                    id: job.id.clone(),
                    status: UploadStatus::Uploading,
                });
            }
            None => self.worker_exited(&mut state),
        }
        job
    }
}
