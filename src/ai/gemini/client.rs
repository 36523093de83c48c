use super::types::{GenerateContentRequest, GenerateContentResponse, InlineData};
use crate::ai::http::{fetch_image, send_json};
use crate::ai::mime::{detect_image_mime, mime_from_content_type};
use crate::source::MAX_IMAGE_BYTES;
use crate::Result;
use base64::Engine as _;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini REST transport for the managed backend.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// `model` may carry the `models/` prefix; it is dropped.
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let model = model.trim_start_matches("models/").to_string();
        let endpoint = Self::endpoint_for(DEFAULT_BASE_URL, &model);
        Self {
            client,
            api_key,
            model,
            endpoint,
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.endpoint = Self::endpoint_for(base_url.trim_end_matches('/'), &self.model);
        self
    }

    fn endpoint_for(base_url: &str, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", base_url, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let builder = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        send_json("Gemini", builder).await
    }

    /// Fetch a remote photo and wrap it as an inline part. The declared
    /// `Content-Type` wins; magic bytes decide otherwise.
    pub async fn download_inline(&self, url: &str) -> Result<InlineData> {
        let builder = self.client.get(url).timeout(self.timeout);
        let (content_type, bytes) = fetch_image(builder, url, MAX_IMAGE_BYTES).await?;
        let mime_type = mime_from_content_type(content_type.as_deref())
            .unwrap_or_else(|| detect_image_mime(&bytes).to_string());
        Ok(InlineData {
            mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }
}
