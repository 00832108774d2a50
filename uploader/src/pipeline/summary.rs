//! Aggregate view over the pipeline's items

use std::fmt;

use serde::Serialize;

use crate::bytes::format_bytes;
use crate::domain::{UploadItem, UploadStatus};

/// Counts by status plus byte totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub total: usize,
    pub queued: usize,
    pub uploading: usize,
    pub complete: usize,
    pub error: usize,
    pub bytes_total: u64,
    pub bytes_complete: u64,
}

impl UploadSummary {
    pub(crate) fn from_items(items: &[UploadItem]) -> Self {
        items.iter().fold(Self::default(), |mut summary, item| {
            let size = item.photo.size();
            summary.total += 1;
            summary.bytes_total += size;
            match item.status {
                UploadStatus::Queued => summary.queued += 1,
                UploadStatus::Uploading => summary.uploading += 1,
                UploadStatus::Complete => {
                    summary.complete += 1;
                    summary.bytes_complete += size;
                }
                UploadStatus::Error => summary.error += 1,
            }
            summary
        })
    }

    /// Nothing waiting and nothing in flight
    pub fn can_close(&self) -> bool {
        self.queued == 0 && self.uploading == 0
    }

    /// One-line status for a progress header
    pub fn header_text(&self) -> String {
        if self.uploading > 0 {
            return format!("Uploading... {}/{}", self.complete, self.total);
        }
        if self.error > 0 {
            return "Upload failed".to_string();
        }
        if self.total > 0 && self.queued == 0 {
            return "Upload complete!".to_string();
        }
        "Upload Photos".to_string()
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} complete ({} of {}), {} failed, {} queued",
            self.complete,
            self.total,
            format_bytes(self.bytes_complete),
            format_bytes(self.bytes_total),
            self.error,
            self.queued
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Photo;

    fn item(status: UploadStatus, size: usize) -> UploadItem {
        let mut item = UploadItem::new(Photo::new("p.jpg", "image/jpeg", vec![0; size]));
        item.status = status;
        item
    }

    #[test]
    fn test_counts_by_status() {
        let items = vec![
            item(UploadStatus::Queued, 10),
            item(UploadStatus::Uploading, 20),
            item(UploadStatus::Complete, 30),
            item(UploadStatus::Complete, 40),
            item(UploadStatus::Error, 50),
        ];
        let summary = UploadSummary::from_items(&items);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.uploading, 1);
        assert_eq!(summary.complete, 2);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.bytes_total, 150);
        assert_eq!(summary.bytes_complete, 70);
        assert!(!summary.can_close());
    }

    #[test]
    fn test_header_text_states() {
        assert_eq!(UploadSummary::default().header_text(), "Upload Photos");

        let uploading = UploadSummary::from_items(&[item(UploadStatus::Uploading, 1), item(UploadStatus::Complete, 1)]);
        assert_eq!(uploading.header_text(), "Uploading... 1/2");

        let failed = UploadSummary::from_items(&[item(UploadStatus::Error, 1), item(UploadStatus::Complete, 1)]);
        assert_eq!(failed.header_text(), "Upload failed");
        assert!(failed.can_close());

        let done = UploadSummary::from_items(&[item(UploadStatus::Complete, 1)]);
        assert_eq!(done.header_text(), "Upload complete!");
    }

    #[test]
    fn test_display_includes_sizes() {
        let summary = UploadSummary::from_items(&[item(UploadStatus::Complete, 1024 * 1024)]);
        assert_eq!(summary.to_string(), "1/1 complete (1MB of 1MB), 0 failed, 0 queued");
    }
}
