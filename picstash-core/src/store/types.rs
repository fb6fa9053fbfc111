//! Record types and the upload policy shared by every store backend

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::UploadedImage;

/// Extensions the store accepts, matched case-insensitively
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Per-file upload size cap
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Metadata describing one stored image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Store-generated filename, unique for the lifetime of the store
    pub filename: String,
    /// Public URL derived from the filename
    pub url: String,
    /// Size in bytes
    pub size: u64,
    /// Last-modified time (unix seconds)
    pub modified: i64,
}

/// One file handed to `ImageStore::upload`
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Name as supplied by the user, informational only
    pub original_name: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(original_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            data,
        }
    }
}

/// Outcome of a batch upload
///
/// Succeeding files commit independently of failing ones; both sides of
/// the batch are enumerated here.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    /// Records committed to the store, in batch order
    pub uploaded: Vec<UploadedImage>,
    /// Per-file error messages for the files that were not stored
    pub errors: Vec<String>,
}

impl UploadReport {
    /// Overall status: ok as soon as anything was stored
    pub fn ok(&self) -> bool {
        !self.uploaded.is_empty()
    }

    /// All per-file errors joined into one message
    pub fn error_summary(&self) -> String {
        self.errors.join(", ")
    }
}

pub(crate) fn allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ext))
}

/// Whether a bare filename carries one of the accepted image extensions
pub(crate) fn has_allowed_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| allowed_extension(ext))
}

/// Replace every character outside `[a-zA-Z0-9_-]` with `_`
pub(crate) fn sanitize_base_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Validate one upload against the extension allow-list and the size cap.
///
/// Returns the sanitized base name and the lowercased extension, or the
/// per-file error message.
pub(crate) fn validate(file: &UploadFile) -> Result<(String, String), String> {
    if file.data.len() > MAX_FILE_SIZE {
        return Err(format!(
            "File {} is too large (max 5 MB)",
            file.original_name
        ));
    }

    let ext = file
        .original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let ext = match ext {
        Some(ext) if allowed_extension(&ext) => ext,
        _ => return Err(format!("Unsupported file type: {}", file.original_name)),
    };

    let base = file
        .original_name
        .rsplit_once('.')
        .map(|(base, _)| base)
        .unwrap_or(&file.original_name);

    Ok((sanitize_base_name(base), ext))
}

/// Build a stored filename: `<base>_<timestamp>_<token>.<ext>`.
///
/// The timestamp plus UUIDv4 token means a name is never reused, even
/// after the file it named is deleted.
pub(crate) fn stored_filename(base: &str, ext: &str, timestamp: i64) -> String {
    format!("{}_{}_{}.{}", base, timestamp, Uuid::new_v4().simple(), ext)
}

/// Public URL for a stored filename under the given prefix
pub(crate) fn url_for(public_base: &str, filename: &str) -> String {
    format!("{}/{}", public_base.trim_end_matches('/'), filename)
}
