//! Shared request plumbing for the provider clients.

use crate::{Error, Result};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Send a prepared request and decode a JSON reply. Transport failures,
/// non-2xx statuses and undecodable bodies all surface as
/// [`Error::AiProvider`] tagged with `provider`.
pub(crate) async fn send_json<Resp: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<Resp> {
    let response = request.send().await.map_err(|e| {
        tracing::error!("Failed to send request to {}: {}", provider, e);
        Error::AiProvider(format!("{} request failed: {}", provider, e))
    })?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::error!("{} API error (status {}): {}", provider, status, body);
        return Err(Error::AiProvider(format!(
            "{} API error (status {}): {}",
            provider, status, body
        )));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse {} response: {}\nBody: {}", provider, e, body);
        Error::AiProvider(format!("Failed to parse {} response: {}", provider, e))
    })
}

/// Download an image, returning its bytes and the server's `Content-Type`.
/// Bodies larger than `max_bytes` are rejected without being buffered whole.
pub(crate) async fn fetch_image(
    request: RequestBuilder,
    url: &str,
    max_bytes: usize,
) -> Result<(Option<String>, Vec<u8>)> {
    let mut response = request.send().await.map_err(|e| {
        tracing::error!("Failed to download image {}: {}", url, e);
        Error::AiProvider(format!("Image download failed for {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        return Err(Error::AiProvider(format!(
            "Image download failed (status {}) for {}",
            response.status(),
            url
        )));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let too_large = || {
        tracing::warn!("Image at {} exceeds {} bytes", url, max_bytes);
        Error::AiProvider(format!("Image at {} exceeds {} bytes", url, max_bytes))
    };
    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(too_large());
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Err(Error::AiProvider(format!("Image at {} is empty", url)));
    }
    Ok((content_type, bytes))
}
