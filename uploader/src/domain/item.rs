//! Upload items and their lifecycle status

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{RecordId, RemoteId};

/// Unique identifier for an upload item (UUID v7, so ids sort by creation)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an upload item
///
/// `Queued -> Uploading -> Complete | Error`; a manual retry moves `Error`
/// back to `Queued`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Queued,
    Uploading,
    Complete,
    Error,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Uploading => "uploading",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Image content type for a file extension, if it is one we upload
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let content_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(content_type)
}

/// The payload to upload
#[derive(Debug, Clone)]
pub struct Photo {
    pub filename: String,
    pub content_type: String,
    pub data: Arc<Vec<u8>>,

    /// Free-form fields copied into the metadata record (title, gallery, ...)
    pub fields: serde_json::Value,
}

impl Photo {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: Arc::new(data),
            fields: serde_json::Value::Null,
        }
    }

    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        self.fields = fields;
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A locally owned resource tied to an item, such as a decoded preview.
///
/// `release` consumes the handle, so it can run at most once; the pipeline
/// holds it in an `Option` and takes it out on whichever path frees it first.
pub struct Preview {
    name: String,
    on_release: Box<dyn FnOnce() + Send>,
}

impl Preview {
    pub fn new(name: impl Into<String>, on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            on_release: Box::new(on_release),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(self) {
        debug!(name = %self.name, "Preview::release: called");
        (self.on_release)();
    }
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preview").field("name", &self.name).finish()
    }
}

/// Invoked once after an item's upload completes
pub type CompletionFn = Arc<dyn Fn(&UploadItemView) + Send + Sync>;

/// A photo tracked by the upload pipeline.
///
/// Status and store ids are written only by the pipeline.
pub struct UploadItem {
    pub(crate) id: ItemId,
    pub(crate) photo: Photo,
    pub(crate) status: UploadStatus,
    pub(crate) remote_id: Option<RemoteId>,
    pub(crate) record_id: Option<RecordId>,
    pub(crate) last_error: Option<String>,
    pub(crate) preview: Option<Preview>,
    pub(crate) on_complete: Option<CompletionFn>,
}

impl UploadItem {
    pub fn new(photo: Photo) -> Self {
        Self {
            id: ItemId::new(),
            photo,
            status: UploadStatus::Queued,
            remote_id: None,
            record_id: None,
            last_error: None,
            preview: None,
            on_complete: None,
        }
    }

    pub fn with_preview(mut self, preview: Preview) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_on_complete(mut self, callback: impl Fn(&UploadItemView) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn photo(&self) -> &Photo {
        &self.photo
    }

    /// Snapshot of the item without its payload or local resources
    pub fn view(&self) -> UploadItemView {
        UploadItemView {
            id: self.id.clone(),
            filename: self.photo.filename.clone(),
            size: self.photo.size(),
            status: self.status,
            remote_id: self.remote_id.clone(),
            record_id: self.record_id.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl fmt::Debug for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadItem")
            .field("id", &self.id)
            .field("filename", &self.photo.filename)
            .field("status", &self.status)
            .field("remote_id", &self.remote_id)
            .field("has_preview", &self.preview.is_some())
            .finish()
    }
}

/// Read-only snapshot of an upload item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadItemView {
    pub id: ItemId,
    pub filename: String,
    pub size: u64,
    pub status: UploadStatus,
    pub remote_id: Option<RemoteId>,
    pub record_id: Option<RecordId>,
    pub last_error: Option<String>,
}
