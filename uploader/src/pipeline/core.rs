//! UploadPipeline implementation

use std::sync::Arc;

use batchpool::run_worker;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::{ItemId, UploadItem, UploadItemView, UploadStatus};
use crate::error::UploadError;
use crate::events::UploadEvent;
use crate::store::UploadContext;

use super::config::PipelineConfig;
use super::state::Shared;
use super::summary::UploadSummary;

/// Long-lived upload queue served by a fixed pool of workers.
///
/// Items keep their status after they finish; callers read progress through
/// the status views or the event stream, not by position. Worker tasks are
/// spawned on the current Tokio runtime, so `enqueue`, `start` and `retry`
/// must be called from inside one.
pub struct UploadPipeline {
    shared: Arc<Shared>,
}

impl UploadPipeline {
    pub fn new(config: PipelineConfig, ctx: UploadContext) -> Self {
        debug!(?config, "UploadPipeline::new: called");
        Self {
            shared: Arc::new(Shared::new(config, ctx)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.shared.events.subscribe()
    }

    /// Add items to the queue and make sure workers are running.
    pub fn enqueue(&self, items: impl IntoIterator<Item = UploadItem>) -> Vec<ItemId> {
        let mut ids = Vec::new();
        {
            let mut state = self.shared.lock();
            for mut item in items {
                item.status = UploadStatus::Queued;
                self.shared.events.emit(UploadEvent::Enqueued {
                    id: item.id.clone(),
                    filename: item.photo.filename.clone(),
                });
                ids.push(item.id.clone());
                state.items.push(item);
            }
        }
        info!(count = ids.len(), "Enqueued photos for upload");

        self.start();
        ids
    }

    /// Top the worker pool up to its configured size.
    ///
    /// Does nothing while the upload target is not ready. Safe to call at any
    /// time; returns the number of workers started.
    pub fn start(&self) -> usize {
        debug!("UploadPipeline::start: called");
        if !self.shared.ctx.target.is_ready() {
            debug!("UploadPipeline::start: upload target not ready, not starting workers");
            return 0;
        }

        let (first_id, count) = self.shared.reserve_workers();

        for n in 0..count {
            let worker_id = first_id + n;
            let delay = self.shared.config.stagger_for(n);
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move {
                let mut slot = WorkerSlot {
                    shared: Arc::clone(&shared),
                    released: false,
                };
                // Stagger only spreads out first claims; exclusivity comes from the claim lock
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let queue = Arc::clone(&shared);
                run_worker(&*queue, worker_id, move |job| Arc::clone(&shared).process(job)).await;
                // The final empty claim already gave the slot back
                slot.released = true;
            });
        }

        if count > 0 {
            info!(count, first_id, "Started upload workers");
        }
        count
    }

    /// Put a failed item back in the queue and restart workers.
    pub fn retry(&self, id: &ItemId) -> Result<(), UploadError> {
        debug!(%id, "UploadPipeline::retry: called");
        {
            let mut state = self.shared.lock();
            let item = state.find_mut(id).ok_or_else(|| UploadError::UnknownItem(id.clone()))?;
            if item.status != UploadStatus::Error {
                return Err(UploadError::NotRetryable {
                    id: id.clone(),
                    status: item.status,
                });
            }
            item.status = UploadStatus::Queued;
            item.last_error = None;
            item.remote_id = None;
        }

        info!(%id, "Retrying upload");
        self.shared.events.emit(UploadEvent::StatusChanged {
            id: id.clone(),
            status: UploadStatus::Queued,
        });
        self.start();
        Ok(())
    }

    /// Drop an item and release its preview.
    ///
    /// Removing an item that has not completed discards its work; without
    /// `force` that returns [`UploadError::Unfinished`] so the caller can
    /// confirm first.
    pub fn remove(&self, id: &ItemId, force: bool) -> Result<UploadItemView, UploadError> {
        debug!(%id, force, "UploadPipeline::remove: called");
        let mut item = {
            let mut state = self.shared.lock();
            let index = state
                .items
                .iter()
                .position(|item| &item.id == id)
                .ok_or_else(|| UploadError::UnknownItem(id.clone()))?;

            let status = state.items[index].status;
            if status != UploadStatus::Complete && !force {
                return Err(UploadError::Unfinished { id: id.clone(), status });
            }
            state.items.remove(index)
        };

        if item.status == UploadStatus::Uploading {
            warn!(%id, "Removed an item while its upload was in flight");
        }
        if let Some(preview) = item.preview.take() {
            preview.release();
        }
        self.shared.events.emit(UploadEvent::Removed { id: id.clone() });
        Ok(item.view())
    }

    /// Discard every item and release all previews.
    ///
    /// With failed items present and no `force`, returns
    /// [`UploadError::DiscardFailed`] instead. Returns the number of items
    /// discarded.
    pub fn close(&self, force: bool) -> Result<usize, UploadError> {
        debug!(force, "UploadPipeline::close: called");
        let items = {
            let mut state = self.shared.lock();
            let failed = state.count(UploadStatus::Error);
            if failed > 0 && !force {
                return Err(UploadError::DiscardFailed { count: failed });
            }
            std::mem::take(&mut state.items)
        };

        let discarded = items.len();
        for mut item in items {
            if let Some(preview) = item.preview.take() {
                preview.release();
            }
        }

        info!(discarded, "Upload pipeline closed");
        self.shared.events.emit(UploadEvent::Closed { discarded });
        Ok(discarded)
    }

    fn filter(&self, status: UploadStatus) -> Vec<UploadItemView> {
        self.shared
            .lock()
            .items
            .iter()
            .filter(|item| item.status == status)
            .map(UploadItem::view)
            .collect()
    }

    pub fn queued(&self) -> Vec<UploadItemView> {
        self.filter(UploadStatus::Queued)
    }

    pub fn uploading(&self) -> Vec<UploadItemView> {
        self.filter(UploadStatus::Uploading)
    }

    pub fn complete(&self) -> Vec<UploadItemView> {
        self.filter(UploadStatus::Complete)
    }

    pub fn errored(&self) -> Vec<UploadItemView> {
        self.filter(UploadStatus::Error)
    }

    /// Every item in enqueue order
    pub fn items(&self) -> Vec<UploadItemView> {
        self.shared.lock().items.iter().map(UploadItem::view).collect()
    }

    pub fn get(&self, id: &ItemId) -> Option<UploadItemView> {
        self.shared
            .lock()
            .items
            .iter()
            .find(|item| &item.id == id)
            .map(UploadItem::view)
    }

    pub fn summary(&self) -> UploadSummary {
        UploadSummary::from_items(&self.shared.lock().items)
    }

    pub fn can_close(&self) -> bool {
        self.summary().can_close()
    }

    pub fn active_workers(&self) -> usize {
        self.shared.active_workers()
    }

    /// Wait until every worker has exited.
    ///
    /// Workers exit when no queued item is left or the target stops being
    /// ready, so queued items may remain afterwards.
    pub async fn wait_idle(&self) {
        debug!("UploadPipeline::wait_idle: called");
        self.shared.wait_idle().await;
    }
}

/// Gives a worker's slot back if its task ends without an empty claim
struct WorkerSlot {
    shared: Arc<Shared>,
    released: bool,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        if !self.released {
            warn!("Upload worker stopped early, releasing its slot");
            self.shared.worker_exited(&mut self.shared.lock());
        }
    }
}
