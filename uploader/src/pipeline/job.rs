//! The upload job a worker runs for each claimed item
//!
//! Remote write, then metadata record. A failed metadata write triggers a
//! compensating delete of the remote object so no file is left without a
//! record.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{ItemId, Photo, PhotoRecord, UploadStatus};
use crate::error::{StoreError, UploadError};
use crate::events::UploadEvent;
use crate::store::{RecordId, RemoteId, RemoteMeta};

use super::state::{Shared, UploadJob};

impl Shared {
    /// Run one claimed item to a terminal status.
    pub(crate) async fn process(self: Arc<Self>, job: UploadJob) {
        let UploadJob { id, photo } = job;
        debug!(%id, filename = %photo.filename, "Shared::process: called");

        let mut claim = ClaimGuard {
            shared: &self,
            id: &id,
            finished: false,
        };
        let outcome = self.upload(&photo).await;
        claim.finished = true;

        match outcome {
            Ok((remote_id, record_id)) => self.mark_complete(&id, remote_id, record_id),
            Err(err) => self.mark_failed(&id, err),
        }
    }

    async fn upload(&self, photo: &Photo) -> Result<(RemoteId, RecordId), UploadError> {
        let owner = self.ctx.target.owner();
        let meta = RemoteMeta {
            filename: photo.filename.clone(),
            content_type: photo.content_type.clone(),
            owner: owner.clone(),
        };

        let remote_id = self.ctx.objects.upload(photo, &meta).await.map_err(UploadError::Remote)?;
        debug!(%remote_id, "Shared::upload: remote write done");

        let record = PhotoRecord::new(remote_id.clone(), owner.as_str(), photo);
        match self.ctx.records.create_record(&record).await {
            Ok(record_id) => Ok((remote_id, record_id)),
            Err(cause) => {
                warn!(%remote_id, error = %cause, "Metadata write failed, deleting remote object");
                Err(self.compensate(remote_id, &owner, cause).await)
            }
        }
    }

    /// Delete the remote object left behind by a failed metadata write.
    ///
    /// Retries up to `compensation_attempts` times. A missing object counts
    /// as deleted. Returns the error the item should be marked with.
    async fn compensate(&self, remote_id: RemoteId, owner: &str, cause: StoreError) -> UploadError {
        let attempts = self.config.compensation_attempts.max(1);
        let mut attempt = 1;

        let failure = loop {
            match self.ctx.objects.delete(&remote_id, owner).await {
                Ok(()) => {
                    info!(%remote_id, attempt, "Deleted remote object after metadata failure");
                    return UploadError::Metadata(cause);
                }
                Err(e) if e.is_not_found() => {
                    debug!(%remote_id, "Shared::compensate: object already gone");
                    return UploadError::Metadata(cause);
                }
                Err(e) if attempt >= attempts => break e,
                Err(e) => {
                    warn!(%remote_id, attempt, error = %e, "Compensating delete failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.config.compensation_backoff()).await;
                }
            }
        };

        error!(%remote_id, attempts, error = %failure, "Compensating delete gave up, remote object orphaned");
        UploadError::Compensation {
            remote_id,
            cause,
            source: failure,
        }
    }

    fn mark_complete(self: &Arc<Self>, id: &ItemId, remote_id: RemoteId, record_id: RecordId) {
        let (view, callback) = {
            let mut state = self.lock();
            let Some(item) = state.find_mut(id) else {
                warn!(%id, %remote_id, "Upload finished for an item that was already removed");
                return;
            };
            item.status = UploadStatus::Complete;
            item.remote_id = Some(remote_id.clone());
            item.record_id = Some(record_id.clone());
            item.last_error = None;
            (item.view(), item.on_complete.clone())
        };

        info!(%id, filename = %view.filename, %remote_id, "Upload complete");
        self.events.emit(UploadEvent::StatusChanged {
            id: id.clone(),
            status: UploadStatus::Complete,
        });
        self.events.emit(UploadEvent::Completed {
            id: id.clone(),
            remote_id,
            record_id,
        });

        if let Some(callback) = callback {
            callback(&view);
        }

        self.schedule_preview_release(id.clone());
    }

    fn mark_failed(&self, id: &ItemId, err: UploadError) {
        error!(%id, error = %err, "Upload failed");
        let orphan = err.orphaned_remote_id().cloned();

        {
            let mut state = self.lock();
            let Some(item) = state.find_mut(id) else {
                warn!(%id, "Upload failed for an item that was already removed");
                return;
            };
            item.status = UploadStatus::Error;
            item.remote_id = orphan.clone();
            item.last_error = Some(err.to_string());
        }

        self.events.emit(UploadEvent::StatusChanged {
            id: id.clone(),
            status: UploadStatus::Error,
        });
        if let Some(remote_id) = orphan {
            self.events.emit(UploadEvent::Orphaned {
                id: id.clone(),
                remote_id,
            });
        }
        self.events.emit(UploadEvent::Failed {
            id: id.clone(),
            error: err.to_string(),
        });
    }

    /// Release the item's preview after the grace period, unless something
    /// else released it first.
    fn schedule_preview_release(self: &Arc<Self>, id: ItemId) {
        let grace = self.config.preview_grace();
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            shared.release_preview(&id);
        });
    }

    pub(crate) fn release_preview(&self, id: &ItemId) {
        let preview = self.lock().find_mut(id).and_then(|item| item.preview.take());
        if let Some(preview) = preview {
            debug!(%id, "Shared::release_preview: releasing");
            preview.release();
        }
    }
}

/// Marks a claimed item failed if its job is dropped before the upload returns
struct ClaimGuard<'a> {
    shared: &'a Shared,
    id: &'a ItemId,
    finished: bool,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(id = %self.id, "Upload job dropped mid-flight");
            self.shared.mark_failed(self.id, UploadError::Abandoned);
        }
    }
}
