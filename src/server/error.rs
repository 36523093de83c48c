use crate::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// HTTP-facing error. The analyzer never exposes its internal taxonomy
/// beyond these four shapes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Analyzer timeout: {0}")]
    Timeout(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Input(msg) => ApiError::BadRequest(msg),
            e if e.is_retryable() => ApiError::Timeout(e.to_string()),
            e => ApiError::Analyzer(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            ApiError::Timeout(details) => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({
                    "error": "Analyzer timeout",
                    "details": details,
                    "retryable": true,
                }),
            ),
            ApiError::Analyzer(details) => {
                tracing::error!("Analyze request failed: {}", details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Analyzer error",
                        "details": details,
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
