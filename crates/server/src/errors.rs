use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use common::CoreError;
use service::errors::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::DuplicateKey(_) => ApiError::Conflict(e.to_string()),
            StoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
            StoreError::Model(m) => ApiError::BadRequest(m.to_string()),
            StoreError::Unavailable(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let msg = self.to_string();
        if status.is_server_error() {
            error!(error = %msg, "request failed");
        }
        (status, Json(serde_json::json!({"error": msg}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_http_statuses() {
        let dup: ApiError = StoreError::DuplicateKey("a@x.com".into()).into();
        assert!(matches!(dup, ApiError::Conflict(_)));

        let missing: ApiError = StoreError::NotFound("a@x.com".into()).into();
        assert!(matches!(missing, ApiError::NotFound(_)));

        let down: ApiError = StoreError::Unavailable("io".into()).into();
        assert!(matches!(down, ApiError::Internal(_)));

        let invalid: ApiError =
            StoreError::Model(models::errors::ModelError::Validation("invalid email".into())).into();
        assert!(matches!(invalid, ApiError::BadRequest(_)));
    }
}
