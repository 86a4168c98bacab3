//! Error types for the mock backend

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Injected failure for {0}")]
    Injected(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            MockError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            MockError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            MockError::Injected(endpoint) => {
                tracing::warn!("Injected failure: {}", endpoint);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Injected failure for {}", endpoint),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
