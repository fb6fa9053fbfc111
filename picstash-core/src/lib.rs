//! Core library for the picstash image gallery
//!
//! This crate provides:
//! - **Store**: `ImageStore` trait with `FsImageStore`, `MemoryImageStore`
//!   and `HttpImageStore` backends
//! - **Protocol**: the JSON wire types spoken between gallery and server
//! - **Session**: `GallerySession`, the client-side gallery state machine
//! - **Engine**: `GalleryEngine` driving store calls off the UI thread
//!
//! # Example
//!
//! ```ignore
//! use picstash_core::{GalleryEngine, GallerySession, MemoryImageStore};
//!
//! let engine = GalleryEngine::new(Arc::new(MemoryImageStore::new()));
//! let mut session = GallerySession::open(Box::new(|snippet| host.insert(snippet)));
//! engine.refresh();
//! ```

pub mod engine;
pub mod protocol;
pub mod session;
pub mod store;

pub use engine::{GalleryCommand, GalleryEngine, GalleryEvent};
pub use session::{GallerySession, InsertCallback, Phase};
pub use store::{
    FsImageStore, HttpImageStore, ImageRecord, ImageStore, MemoryImageStore, UploadFile,
    UploadReport,
};
