//! In-memory ImageStore implementation

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::protocol::UploadedImage;
use crate::store::types::{
    has_allowed_extension, stored_filename, url_for, validate, ImageRecord, UploadFile,
    UploadReport,
};
use crate::store::ImageStore;

struct StoredFile {
    data: Vec<u8>,
    modified: i64,
}

/// In-memory image store for tests and embedded use
///
/// Applies the same naming and validation policy as `FsImageStore`.
/// `modified` is a monotonic tick rather than wall-clock time, so list
/// ordering is deterministic even for rapid uploads.
pub struct MemoryImageStore {
    files: Mutex<HashMap<String, StoredFile>>,
    clock: Mutex<i64>,
    public_base: String,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            clock: Mutex::new(0),
            public_base: "/assets/images".to_string(),
        }
    }

    fn tick(&self) -> i64 {
        let mut clock = self.clock.lock().unwrap();
        *clock += 1;
        *clock
    }

    /// Raw bytes of a stored file, if present
    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(filename)
            .map(|f| f.data.clone())
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
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

            let mut stored = self.files.lock().unwrap();
            let timestamp = Utc::now().timestamp();
            let mut filename = stored_filename(&base, &ext, timestamp);
            while stored.contains_key(&filename) {
                filename = stored_filename(&base, &ext, timestamp);
            }

            let size = file.data.len() as u64;
            stored.insert(
                filename.clone(),
                StoredFile {
                    data: file.data,
                    modified: self.tick(),
                },
            );

            report.uploaded.push(UploadedImage {
                url: url_for(&self.public_base, &filename),
                filename,
                original: file.original_name,
                size,
            });
        }

        Ok(report)
    }

    async fn list(&self) -> Result<Vec<ImageRecord>> {
        let files = self.files.lock().unwrap();
        let mut records: Vec<ImageRecord> = files
            .iter()
            .map(|(filename, file)| ImageRecord {
                filename: filename.clone(),
                url: url_for(&self.public_base, filename),
                size: file.data.len() as u64,
                modified: file.modified,
            })
            .collect();

        records.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(records)
    }

    async fn delete(&self, filename: &str) -> Result<bool> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("No filename given"))?;

        if !has_allowed_extension(name) {
            return Ok(false);
        }

        Ok(self.files.lock().unwrap().remove(name).is_some())
    }
}
