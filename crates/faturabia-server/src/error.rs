use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use faturabia::error::SyncError;
use serde_json::json;

/// Error body shared by every route: `{ "error": <kind>, "message": <text> }`.
#[derive(Debug)]
pub enum ApiError {
    Sync(SyncError),
    BadRequest(String),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError::Sync(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Sync(err) => match err {
                SyncError::MissingCredential(_) => StatusCode::BAD_REQUEST,
                SyncError::UserNotFound(_) | SyncError::CustomerNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                SyncError::Upstream { .. } | SyncError::Transport(_) | SyncError::Decode(_) => {
                    StatusCode::BAD_GATEWAY
                }
                SyncError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                SyncError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Sync(err) => err.kind(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            // Storage failures carry filesystem paths.
            ApiError::Sync(SyncError::Persistence(_)) => "Storage unavailable".to_string(),
            ApiError::Sync(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let body = json!({
            "error": self.kind(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}
