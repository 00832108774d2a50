//! PhotoUp - concurrent photo uploader
//!
//! Pushes photos to a remote object store with a fixed pool of workers,
//! records metadata for every stored object, and deletes the remote object
//! again when its metadata cannot be written.
//!
//! # Core Concepts
//!
//! - **Status, Not Position**: every item carries its own lifecycle status
//! - **Two-Phase Write**: remote object first, metadata record second
//! - **Compensation**: a failed metadata write deletes the orphaned remote object
//! - **Injected Collaborators**: stores and credentials are passed in, never global
//!
//! # Modules
//!
//! - [`pipeline`] - `UploadPipeline` and its worker pool
//! - [`store`] - Object/metadata store traits and the local filesystem backend
//! - [`domain`] - Upload items, statuses and metadata records
//! - [`events`] - Broadcast stream of upload events
//! - [`scan`] - Pre-flight file inspection on the batch scheduler
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod bytes;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod scan;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use domain::{ItemId, Photo, PhotoRecord, Preview, UploadItem, UploadItemView, UploadStatus};
pub use error::{ScanError, StoreError, UploadError};
pub use events::{EventBus, UploadEvent};
pub use pipeline::{PipelineConfig, UploadPipeline, UploadSummary};
pub use store::{MetadataStore, ObjectStore, RecordId, RemoteId, RemoteMeta, UploadContext, UploadTarget};
