//! Domain types for the upload pipeline

mod item;
mod record;

pub use item::{CompletionFn, ItemId, Photo, Preview, UploadItem, UploadItemView, UploadStatus, content_type_for};
pub use record::PhotoRecord;
