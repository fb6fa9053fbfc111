//! Wire types for the upload/list/delete protocol
//!
//! JSON shapes shared by the HTTP server and `HttpImageStore`. Every
//! operation answers with a structured `ok` status; expected bad input is
//! reported in-band, never as a transport-level failure.

use serde::{Deserialize, Serialize};

use crate::store::ImageRecord;

/// Error string reported when deleting a filename the store does not hold
pub const NOT_FOUND_ERROR: &str = "File not found";

/// One stored record as reported back from an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub filename: String,
    /// Name the file was uploaded under, informational only
    pub original: String,
    pub url: String,
    pub size: u64,
}

/// Response to `POST /api/images/upload`
///
/// `ok: false` with a joined `error` only when nothing in the batch was
/// stored; partial success is `ok: true` with both lists populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploaded: Vec<UploadedImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to `GET /api/images/list`, newest-modified first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponse {
    pub ok: bool,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /api/images/delete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub filename: String,
}

/// Response to `POST /api/images/delete`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_omits_empty_fields() {
        let response = UploadResponse {
            ok: false,
            error: Some("Unsupported file type: a.txt".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"ok":false,"error":"Unsupported file type: a.txt"}"#
        );
    }

    #[test]
    fn test_list_response_round_trip() {
        let json = r#"{"ok":true,"images":[{"filename":"a_1_b.png","url":"/assets/images/a_1_b.png","size":3,"modified":1700000000}]}"#;
        let parsed: ListResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.images.len(), 1);
        assert_eq!(parsed.images[0].filename, "a_1_b.png");
    }
}
