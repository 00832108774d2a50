//! Collaborators the upload pipeline writes to
//!
//! The pipeline never reaches for a global client: everything it talks to is
//! handed over in an [`UploadContext`] when the pipeline is built.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Photo, PhotoRecord};
use crate::error::StoreError;

pub mod local;

pub use local::{DirObjectStore, JsonlRecordStore, LocalTarget, StoredRecord};

/// Identifier assigned by the object store to an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a metadata record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata sent with the object itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMeta {
    pub filename: String,
    pub content_type: String,
    pub owner: String,
}

/// Credential/destination check consulted before every claim
pub trait UploadTarget: Send + Sync {
    /// Whether uploads can start right now (credential valid, destination present)
    fn is_ready(&self) -> bool;

    /// Owner context recorded with objects and passed to deletes
    fn owner(&self) -> String;
}

/// Remote object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, photo: &Photo, meta: &RemoteMeta) -> Result<RemoteId, StoreError>;

    /// Delete by id. Missing objects must report [`StoreError::NotFound`].
    async fn delete(&self, id: &RemoteId, owner: &str) -> Result<(), StoreError>;
}

/// Metadata persistence
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create_record(&self, record: &PhotoRecord) -> Result<RecordId, StoreError>;
}

/// Everything an upload worker needs, passed in explicitly
#[derive(Clone)]
pub struct UploadContext {
    pub target: Arc<dyn UploadTarget>,
    pub objects: Arc<dyn ObjectStore>,
    pub records: Arc<dyn MetadataStore>,
}

impl UploadContext {
    pub fn new(target: Arc<dyn UploadTarget>, objects: Arc<dyn ObjectStore>, records: Arc<dyn MetadataStore>) -> Self {
        Self {
            target,
            objects,
            records,
        }
    }
}
