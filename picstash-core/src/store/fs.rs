//! Flat-directory image store on the local filesystem
//!
//! Files are written with a temp-file-then-rename move so a crashed
//! upload never leaves a half-written image visible to `list`.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::protocol::UploadedImage;
use crate::store::types::{
    has_allowed_extension, stored_filename, url_for, validate, ImageRecord, UploadFile,
    UploadReport,
};
use crate::store::ImageStore;

/// Image store backed by a flat directory of files
///
/// The directory is created on the first upload. Stored names embed a
/// creation timestamp and a UUIDv4 token, so a name is never reused even
/// after the file it named is deleted.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
    public_base: String,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a stored filename
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Pick a stored name that no current file uses
    fn next_filename(&self, base: &str, ext: &str) -> String {
        let timestamp = Utc::now().timestamp();
        let mut filename = stored_filename(base, ext, timestamp);
        while self.path_for(&filename).exists() {
            filename = stored_filename(base, ext, timestamp);
        }
        filename
    }

    /// Write atomically using a temp file
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, path).await?;

        Ok(())
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadReport> {
        let mut report = UploadReport::default();

        if files.is_empty() {
            report.errors.push("No files to upload".to_string());
            return Ok(report);
        }

        for file in files {
            let (base, ext) = match validate(&file) {
                Ok(parts) => parts,
                Err(message) => {
                    report.errors.push(message);
                    continue;
                }
            };

            let filename = self.next_filename(&base, &ext);
            let path = self.path_for(&filename);

            match self.write_file(&path, &file.data).await {
                Ok(()) => {
                    info!(
                        "stored {} ({} bytes) as {}",
                        file.original_name,
                        file.data.len(),
                        filename
                    );
                    report.uploaded.push(UploadedImage {
                        url: url_for(&self.public_base, &filename),
                        filename,
                        original: file.original_name,
                        size: file.data.len() as u64,
                    });
                }
                Err(e) => {
                    warn!("failed to store {}: {}", file.original_name, e);
                    report
                        .errors
                        .push(format!("Failed to save file: {}", file.original_name));
                }
            }
        }

        Ok(report)
    }

    async fn list(&self) -> Result<Vec<ImageRecord>> {
        if !fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !has_allowed_extension(name) {
                continue;
            }

            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            records.push(ImageRecord {
                filename: name.to_string(),
                url: url_for(&self.public_base, name),
                size: metadata.len(),
                modified,
            });
        }

        // Stable sort: equal timestamps keep enumeration order
        records.sort_by_key(|r| Reverse(r.modified));

        Ok(records)
    }

    async fn delete(&self, filename: &str) -> Result<bool> {
        // Only the base name is ever joined to the store directory,
        // whatever path-like string the caller supplied
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("No filename given"))?;

        // Names without an accepted image extension are outside the
        // store's view of the directory
        if !has_allowed_extension(name) {
            return Ok(false);
        }

        let path = self.root.join(name);
        if !fs::try_exists(&path).await? {
            return Ok(false);
        }

        fs::remove_file(&path).await?;
        info!("deleted {}", name);
        Ok(true)
    }
}
