//! Pre-flight file inspection
//!
//! Expands the paths given on the command line and checks every file
//! concurrently on the batch scheduler before anything is uploaded.

use std::path::{Path, PathBuf};

use batchpool::{BatchAborted, SchedulerConfig, TaskResult, TaskScheduler};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{Photo, content_type_for};
use crate::error::ScanError;

/// A file that passed inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub size: u64,
    #[serde(rename = "content-type")]
    pub content_type: String,
}

pub type ScanResult = TaskResult<PathBuf, FileReport, ScanError>;

/// Expand directories into the files beneath them.
///
/// Files are kept in argument order; each directory contributes its files
/// sorted by name. Paths that do not exist are passed through so that
/// inspection reports them.
pub fn collect_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    debug!(count = inputs.len(), "collect_paths: called");
    let mut paths = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let walker = WalkDir::new(input).sort_by_file_name().into_iter();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!(path = %input.display(), error = %e, "Skipping unreadable directory entry"),
            }
        }
    }

    debug!(count = paths.len(), "collect_paths: expanded");
    paths
}

/// Check that `path` is a non-empty image file we know how to upload
pub async fn inspect(path: PathBuf) -> Result<FileReport, ScanError> {
    debug!(path = %path.display(), "inspect: called");
    let metadata = tokio::fs::metadata(&path).await.map_err(|source| ScanError::Unreadable {
        path: path.clone(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(ScanError::NotAFile { path });
    }
    if metadata.len() == 0 {
        return Err(ScanError::Empty { path });
    }
    let Some(content_type) = content_type_for(&path) else {
        return Err(ScanError::Unsupported { path });
    };

    Ok(FileReport {
        size: metadata.len(),
        content_type: content_type.to_string(),
        path,
    })
}

/// Inspect every path concurrently; results come back in input order.
pub async fn scan(paths: Vec<PathBuf>, config: &SchedulerConfig) -> Result<Vec<ScanResult>, BatchAborted<PathBuf, FileReport, ScanError>> {
    debug!(count = paths.len(), ?config, "scan: called");
    TaskScheduler::from_config(config).run(paths, inspect).await
}

/// Read a file into a [`Photo`] ready for upload
pub async fn load_photo(path: PathBuf) -> Result<Photo, ScanError> {
    let report = inspect(path).await?;
    let data = tokio::fs::read(&report.path).await.map_err(|source| ScanError::Unreadable {
        path: report.path.clone(),
        source,
    })?;

    let filename = file_name(&report.path);
    debug!(%filename, size = data.len(), "load_photo: loaded");
    Ok(Photo::new(filename, report.content_type, data))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
