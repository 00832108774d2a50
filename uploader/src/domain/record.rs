//! Metadata record written after a successful remote upload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::RemoteId;

use super::item::Photo;

/// Metadata row referencing a stored remote object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    #[serde(rename = "remote-id")]
    pub remote_id: RemoteId,

    /// Owner context the remote object was written under
    pub owner: String,

    pub filename: String,

    #[serde(rename = "content-type")]
    pub content_type: String,

    pub size: u64,

    #[serde(default)]
    pub fields: serde_json::Value,

    #[serde(rename = "uploaded-at")]
    pub uploaded_at: DateTime<Utc>,
}

impl PhotoRecord {
    pub fn new(remote_id: RemoteId, owner: impl Into<String>, photo: &Photo) -> Self {
        Self {
            remote_id,
            owner: owner.into(),
            filename: photo.filename.clone(),
            content_type: photo.content_type.clone(),
            size: photo.size(),
            fields: photo.fields.clone(),
            uploaded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_copies_photo_fields() {
        let photo = Photo::new("beach.png", "image/png", vec![0; 16]).with_fields(serde_json::json!({"title": "Beach"}));
        let record = PhotoRecord::new(RemoteId::from("obj-1"), "rachel", &photo);

        assert_eq!(record.remote_id.as_str(), "obj-1");
        assert_eq!(record.owner, "rachel");
        assert_eq!(record.size, 16);
        assert_eq!(record.fields["title"], "Beach");
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let photo = Photo::new("a.jpg", "image/jpeg", vec![1]);
        let record = PhotoRecord::new(RemoteId::from("obj-2"), "owner", &photo);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"remote-id\":\"obj-2\""));
        let back: PhotoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
