use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

/// Client for the external blob-store collaborator. Messages never persist a
/// raw image payload — the payload is exchanged for a durable URL before the
/// message is written, and an upload failure aborts the whole send.
pub struct ImageStore {
    client: reqwest::Client,
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl ImageStore {
    pub fn new(upload_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url,
        }
    }

    /// Exchange an inline image payload (data URI) for a durable URL.
    pub async fn upload(&self, payload: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(&self.upload_url)
            .json(&serde_json::json!({ "file": payload }))
            .send()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "image store returned {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        debug!("Image uploaded: {}", body.secure_url);
        Ok(body.secure_url)
    }
}
