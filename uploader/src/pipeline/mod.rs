//! Upload pipeline
//!
//! A queue of [`UploadItem`](crate::domain::UploadItem)s served by a fixed
//! pool of workers running on the shared `batchpool` worker loop.

mod config;
mod core;
mod job;
mod state;
mod summary;

pub use self::config::PipelineConfig;
pub use self::core::UploadPipeline;
pub use self::summary::UploadSummary;
