//! Store abstractions for persisted gallery images
//!
//! Three implementations of the same `ImageStore` trait, making them
//! interchangeable behind the gallery engine:
//!
//! - `FsImageStore` - flat directory on the local filesystem
//! - `MemoryImageStore` - in-memory store for tests and embedded use
//! - `HttpImageStore` - remote store reached over the upload/list/delete
//!   HTTP protocol

mod fs;
mod http;
mod memory;
mod types;

pub use fs::FsImageStore;
pub use http::HttpImageStore;
pub use memory::MemoryImageStore;
pub use types::{ImageRecord, UploadFile, UploadReport};

use anyhow::Result;
use async_trait::async_trait;

/// File-management contract between the gallery and an image store
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store a batch of files.
    ///
    /// Individual failures never abort the batch; they are reported per
    /// file in the returned report. The report is overall-ok as soon as
    /// at least one file was committed.
    async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadReport>;

    /// Enumerate stored images, most recently modified first.
    async fn list(&self) -> Result<Vec<ImageRecord>>;

    /// Delete a stored image by filename.
    ///
    /// Only the base name of the input is ever considered; directory
    /// components are stripped.
    ///
    /// Returns Ok(true) if deleted, Ok(false) if no such file exists
    async fn delete(&self, filename: &str) -> Result<bool>;
}
