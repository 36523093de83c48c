//! Image reference resolution
//!
//! Turns the caller's `imageUrl` / `imageBase64` into a validated
//! [`ImageSource`] that the inference clients can embed in a request.

use crate::ai::mime::detect_image_mime;
use crate::models::AnalyzeInput;
use crate::{Error, Result};
use base64::Engine as _;

pub const MISSING_IMAGE_MESSAGE: &str = "Provide imageUrl or imageBase64";

/// Largest image accepted from an upload or a remote fetch.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Remote image the provider (or the client) fetches by URL.
    Url(String),
    /// Base64 payload with its MIME type.
    Inline { mime_type: String, data: String },
}

impl ImageSource {
    pub fn from_input(input: &AnalyzeInput) -> Result<Self> {
        let url = non_blank(input.image_url.as_deref());
        let base64 = non_blank(input.image_base64.as_deref());

        match (url, base64) {
            (None, None) => Err(Error::Input(MISSING_IMAGE_MESSAGE.to_string())),
            (Some(_), Some(_)) => Err(Error::Input(
                "Provide only one of imageUrl or imageBase64".to_string(),
            )),
            (Some(url), None) => Self::from_url(url),
            (None, Some(payload)) => Self::from_base64(payload),
        }
    }

    fn from_url(url: &str) -> Result<Self> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::Input(format!(
                "imageUrl must be an http(s) URL, got '{}'",
                url
            )));
        }
        Ok(Self::Url(url.to_string()))
    }

    fn from_base64(payload: &str) -> Result<Self> {
        let (declared_mime, encoded) = match payload.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or_else(|| {
                    Error::Input("imageBase64 data URL has no payload".to_string())
                })?;
                let mime = header.strip_suffix(";base64").ok_or_else(|| {
                    Error::Input("imageBase64 data URL must be base64-encoded".to_string())
                })?;
                (Some(mime.to_string()), data)
            }
            None => (None, payload),
        };

        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&cleaned)
            .map_err(|e| Error::Input(format!("imageBase64 is not valid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::Input("imageBase64 decodes to an empty image".to_string()));
        }

        let mime_type = declared_mime
            .filter(|m| m.starts_with("image/"))
            .unwrap_or_else(|| detect_image_mime(&bytes).to_string());

        Ok(Self::Inline {
            mime_type,
            data: cleaned,
        })
    }

    /// URL form accepted by OpenAI-style `image_url` parts.
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Url(url) => url.clone(),
            ImageSource::Inline { mime_type, data } => {
                format!("data:{};base64,{}", mime_type, data)
            }
        }
    }

    /// Stable text identifying the image, used to seed deterministic output.
    pub fn fingerprint(&self) -> &str {
        match self {
            ImageSource::Url(url) => url,
            ImageSource::Inline { data, .. } => data,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ImageSource::Url(url) => format!("url {}", url),
            ImageSource::Inline { mime_type, data } => {
                format!("inline {} ({} base64 chars)", mime_type, data.len())
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
