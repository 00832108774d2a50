//! Filesystem-backed stores
//!
//! Objects are files in a directory, metadata records are lines in a JSONL
//! file. Used by the CLI and handy for tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Photo, PhotoRecord};
use crate::error::StoreError;

use super::{MetadataStore, ObjectStore, RecordId, RemoteId, RemoteMeta, UploadTarget};

/// Ready while the object directory exists
pub struct LocalTarget {
    root: PathBuf,
    owner: String,
}

impl LocalTarget {
    pub fn new(root: impl Into<PathBuf>, owner: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            owner: owner.into(),
        }
    }
}

impl UploadTarget for LocalTarget {
    fn is_ready(&self) -> bool {
        self.root.is_dir()
    }

    fn owner(&self) -> String {
        self.owner.clone()
    }
}

/// One file per object, named by a fresh UUID v7 plus the original extension
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, id: &RemoteId) -> Result<PathBuf, StoreError> {
        let name = id.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StoreError::Rejected(format!("invalid object id: {}", name)));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ObjectStore for DirObjectStore {
    async fn upload(&self, photo: &Photo, meta: &RemoteMeta) -> Result<RemoteId, StoreError> {
        debug!(filename = %meta.filename, size = photo.size(), "DirObjectStore::upload: called");
        let stem = Uuid::now_v7().to_string();
        let name = match Path::new(&meta.filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", stem, ext.to_lowercase()),
            None => stem,
        };
        let id = RemoteId::from(name);

        let path = self.object_path(&id)?;
        tokio::fs::write(&path, photo.data.as_slice()).await?;
        debug!(%id, path = %path.display(), "DirObjectStore::upload: written");
        Ok(id)
    }

    async fn delete(&self, id: &RemoteId, owner: &str) -> Result<(), StoreError> {
        debug!(%id, %owner, "DirObjectStore::delete: called");
        let path = self.object_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// A metadata record as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,

    #[serde(flatten)]
    pub record: PhotoRecord,
}

/// Appends one JSON line per record
pub struct JsonlRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read every stored record; a missing file means no records yet
    pub async fn read_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        debug!(path = %self.path.display(), "JsonlRecordStore::read_all: called");
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl MetadataStore for JsonlRecordStore {
    async fn create_record(&self, record: &PhotoRecord) -> Result<RecordId, StoreError> {
        debug!(remote_id = %record.remote_id, "JsonlRecordStore::create_record: called");
        let id = RecordId::from(Uuid::now_v7().to_string());
        let stored = StoredRecord {
            id: id.clone(),
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&stored)?;
        line.push('\n');

        // Lines from concurrent workers must not interleave
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(%id, "JsonlRecordStore::create_record: appended");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(filename: &str) -> RemoteMeta {
        RemoteMeta {
            filename: filename.to_string(),
            content_type: "image/jpeg".to_string(),
            owner: "tester".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_writes_file_with_extension() {
        let dir = TempDir::new().unwrap();
        let store = DirObjectStore::new(dir.path());
        let photo = Photo::new("Sunset.JPG", "image/jpeg", vec![7; 32]);

        let id = store.upload(&photo, &meta("Sunset.JPG")).await.unwrap();

        assert!(id.as_str().ends_with(".jpg"));
        let written = std::fs::read(dir.path().join(id.as_str())).unwrap();
        assert_eq!(written.len(), 32);
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let store = DirObjectStore::new(dir.path());
        let photo = Photo::new("a.png", "image/png", vec![1]);
        let id = store.upload(&photo, &meta("a.png")).await.unwrap();

        store.delete(&id, "tester").await.unwrap();
        let err = store.delete(&id, "tester").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = DirObjectStore::new(dir.path());

        let err = store.delete(&RemoteId::from("../etc/passwd"), "tester").await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[test]
    fn test_target_ready_only_when_dir_exists() {
        let dir = TempDir::new().unwrap();
        assert!(LocalTarget::new(dir.path(), "me").is_ready());
        assert!(!LocalTarget::new(dir.path().join("missing"), "me").is_ready());
        assert_eq!(LocalTarget::new(dir.path(), "me").owner(), "me");
    }

    #[tokio::test]
    async fn test_records_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let store = JsonlRecordStore::new(dir.path().join("meta").join("records.jsonl"));
        assert!(store.read_all().await.unwrap().is_empty());

        let photo = Photo::new("a.jpg", "image/jpeg", vec![1, 2]);
        let first = store
            .create_record(&PhotoRecord::new(RemoteId::from("obj-1"), "me", &photo))
            .await
            .unwrap();
        let second = store
            .create_record(&PhotoRecord::new(RemoteId::from("obj-2"), "me", &photo))
            .await
            .unwrap();
        assert_ne!(first, second);

        let records = store.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first);
        assert_eq!(records[1].record.remote_id.as_str(), "obj-2");
    }
}
