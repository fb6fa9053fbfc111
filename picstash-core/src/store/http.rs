//! Remote image store reached over the upload/list/delete HTTP protocol

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use tracing::{event, Level};

use crate::protocol::{
    DeleteRequest, DeleteResponse, ListResponse, UploadResponse, NOT_FOUND_ERROR,
};
use crate::store::types::{ImageRecord, UploadFile, UploadReport};
use crate::store::ImageStore;

/// Client-side `ImageStore` speaking the gallery wire protocol
///
/// Transport failures (unreachable server, non-success status, unparsable
/// body) surface as `Err`; in-band `ok: false` statuses are mapped back
/// onto the trait's result types.
#[derive(Clone)]
pub struct HttpImageStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageStore {
    pub fn new(base_url: &str) -> Self {
        HttpImageStore {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/api/images/{}", self.base_url, action)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow::anyhow!(
                "Request failed with status {}: {}",
                status,
                error_body
            ));
        }

        let text = response.text().await?;
        event!(Level::TRACE, response = text);

        Ok(serde_json::from_str::<T>(&text)?)
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<UploadReport> {
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.data).file_name(file.original_name);
            form = form.part("images[]", part);
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let parsed: UploadResponse = Self::decode(response).await?;

        let mut errors = parsed.errors;
        if let Some(error) = parsed.error {
            errors.push(error);
        }
        Ok(UploadReport {
            uploaded: parsed.uploaded,
            errors,
        })
    }

    async fn list(&self) -> Result<Vec<ImageRecord>> {
        let response = self.client.get(self.endpoint("list")).send().await?;
        let parsed: ListResponse = Self::decode(response).await?;

        if !parsed.ok {
            return Err(anyhow::anyhow!(parsed
                .error
                .unwrap_or_else(|| "List request failed".to_string())));
        }
        Ok(parsed.images)
    }

    async fn delete(&self, filename: &str) -> Result<bool> {
        let request = DeleteRequest {
            filename: filename.to_string(),
        };
        let response = self
            .client
            .post(self.endpoint("delete"))
            .json(&request)
            .send()
            .await?;
        let parsed: DeleteResponse = Self::decode(response).await?;

        if parsed.ok {
            return Ok(true);
        }
        match parsed.error.as_deref() {
            Some(NOT_FOUND_ERROR) => Ok(false),
            Some(error) => Err(anyhow::anyhow!(error.to_string())),
            None => Err(anyhow::anyhow!("Delete request failed")),
        }
    }
}
