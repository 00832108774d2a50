//! Error types for stores, uploads and file scanning

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{ItemId, UploadStatus};
use crate::store::RemoteId;

/// Errors reported by an object or metadata store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Missing objects make deletes idempotent
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Errors from the upload pipeline
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Remote upload failed: {0}")]
    Remote(#[source] StoreError),

    #[error("Metadata record failed: {0}")]
    Metadata(#[source] StoreError),

    /// The metadata write failed and the remote object it left behind could
    /// not be deleted either
    #[error("Metadata record failed ({cause}); remote object {remote_id} left orphaned: {source}")]
    Compensation {
        remote_id: RemoteId,
        cause: StoreError,
        #[source]
        source: StoreError,
    },

    /// The worker running this item stopped before reaching a result
    #[error("Upload worker stopped before the item finished")]
    Abandoned,

    #[error("Upload item not found: {0}")]
    UnknownItem(ItemId),

    #[error("Item {id} is {status}, only failed items can be retried")]
    NotRetryable { id: ItemId, status: UploadStatus },

    #[error("Item {id} is {status}; removing it discards work that has not been uploaded")]
    Unfinished { id: ItemId, status: UploadStatus },

    #[error("{count} failed uploads would be discarded")]
    DiscardFailed { count: usize },
}

impl UploadError {
    /// Remote object left behind by a failed compensation, if any
    pub fn orphaned_remote_id(&self) -> Option<&RemoteId> {
        match self {
            UploadError::Compensation { remote_id, .. } => Some(remote_id),
            _ => None,
        }
    }

    /// Warnings the caller may override by confirming
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, UploadError::Unfinished { .. } | UploadError::DiscardFailed { .. })
    }
}

/// Reasons a file fails pre-flight inspection
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    #[error("Empty file: {path}")]
    Empty { path: PathBuf },

    #[error("Unsupported file type: {path}")]
    Unsupported { path: PathBuf },
}
