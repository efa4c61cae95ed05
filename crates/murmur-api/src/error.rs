use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// API error taxonomy. NotFound and Validation surface as 4xx with a
/// descriptive message; an image-store failure is a 502 (the send is aborted
/// before anything is persisted); storage failures are 500 and never retried
/// here.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("image upload failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    /// Wrap a spawn_blocking join failure; a panicked worker is a storage
    /// fault from the caller's perspective.
    pub fn join(e: tokio::task::JoinError) -> Self {
        Self::Storage(anyhow::anyhow!("blocking task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(e) => {
                error!("storage failure: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
