use super::error::ApiError;
use crate::app::App;
use crate::models::{AnalyzeInput, AnalyzeOutput, BackendId};
use crate::source::MAX_IMAGE_BYTES;
use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

pub const MAX_UPLOAD_BYTES: usize = MAX_IMAGE_BYTES;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backends: Vec<BackendId>,
    pub started_at: DateTime<Utc>,
}

/// GET /health
pub async fn health(State(app): State<Arc<App>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backends: app.backends(),
        started_at: app.started_at(),
    })
}

/// POST /analyze
pub async fn analyze(
    State(app): State<Arc<App>>,
    payload: Result<Json<AnalyzeInput>, JsonRejection>,
) -> Result<Json<AnalyzeOutput>, ApiError> {
    let Json(input) = payload.map_err(|e| {
        warn!("Rejected analyze body: {}", e.body_text());
        ApiError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;

    Ok(Json(app.analyze(&input).await?))
}

/// POST /analyze/upload
///
/// Multipart form with a binary `image` field and an optional `region`.
pub async fn analyze_upload(
    State(app): State<Arc<App>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeOutput>, ApiError> {
    let mut image: Option<axum::body::Bytes> = None;
    let mut region: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {}", e);
        ApiError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read image: {}", e))
                })?;
                if data.is_empty() {
                    return Err(ApiError::BadRequest("Image cannot be empty".to_string()));
                }
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "Image too large. Max size is {} bytes",
                        MAX_UPLOAD_BYTES
                    )));
                }
                image = Some(data);
            }
            "region" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read region: {}", e))
                })?;
                region = Some(text);
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| {
        ApiError::BadRequest("Missing 'image' field in multipart form".to_string())
    })?;

    let input = AnalyzeInput::from_bytes(&image).with_region(region);
    Ok(Json(app.analyze(&input).await?))
}
