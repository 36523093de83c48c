use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerationConfig, InlineData, Part,
};
use crate::ai::{VisionModel, VisionRequest};
use crate::source::ImageSource;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Managed vision backend client built on Gemini `generateContent`.
pub struct GeminiVisionClient {
    http: GeminiHttpClient,
}

impl GeminiVisionClient {
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    /// Gemini only accepts inline bytes for arbitrary images, so remote URLs
    /// are downloaded first.
    async fn inline_image(&self, image: &ImageSource) -> Result<InlineData> {
        match image {
            ImageSource::Inline { mime_type, data } => Ok(InlineData {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            ImageSource::Url(url) => self.http.download_inline(url).await,
        }
    }
}

#[async_trait]
impl VisionModel for GeminiVisionClient {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    /// Remote images are downloaded here so later requests reuse the bytes.
    async fn prepare_image(&self, image: &ImageSource) -> Result<ImageSource> {
        let inline = self.inline_image(image).await?;
        Ok(ImageSource::Inline {
            mime_type: inline.mime_type,
            data: inline.data,
        })
    }

    async fn generate_json(&self, request: &VisionRequest<'_>) -> Result<String> {
        tracing::debug!(
            "Requesting '{}' from Gemini model {} for {}",
            request.schema_name,
            self.http.model(),
            request.image.describe()
        );

        let inline_data = self.inline_image(request.image).await?;

        // No strict schema mode here; the schema travels in the instruction.
        let user_text = format!(
            "{}\n\nRespond with a single JSON object matching this JSON schema:\n{}",
            request.user, request.schema
        );

        let body = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: request.system.clone(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData { inline_data },
                    Part::Text { text: user_text },
                ],
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(request.max_tokens),
                response_mime_type: Some("application/json".to_string()),
                temperature: Some(0.2),
            }),
        };

        let response = self.http.generate_content(&body).await?;

        response
            .first_text()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::AiProvider("No text in Gemini response".to_string()))
    }
}
