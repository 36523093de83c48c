use super::client::OpenAiHttpClient;
use super::types::{
    ChatCompletionRequest, ChatMessage, ChatMessageContent, ImageUrl, JsonSchema, MessagePart,
    ResponseFormat,
};
use crate::ai::{VisionModel, VisionRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Direct vision-API client speaking the OpenAI chat-completions dialect.
pub struct OpenAiVisionClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiVisionClient {
    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, timeout, client),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, request: &VisionRequest<'_>) -> ChatCompletionRequest {
        let system_message = ChatMessage {
            role: "system".to_string(),
            content: Some(ChatMessageContent::Text(request.system.clone())),
            refusal: None,
        };

        let user_message = ChatMessage {
            role: "user".to_string(),
            content: Some(ChatMessageContent::Parts(vec![
                MessagePart {
                    part_type: "text".to_string(),
                    text: Some(request.user.clone()),
                    image_url: None,
                },
                MessagePart {
                    part_type: "image_url".to_string(),
                    text: None,
                    image_url: Some(ImageUrl {
                        url: request.image.to_url(),
                        detail: Some("high".to_string()),
                    }),
                },
            ])),
            refusal: None,
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![system_message, user_message],
            max_completion_tokens: request.max_tokens,
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchema {
                    name: request.schema_name.to_string(),
                    schema: request.schema.clone(),
                    strict: true,
                },
            }),
        }
    }
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn generate_json(&self, request: &VisionRequest<'_>) -> Result<String> {
        tracing::debug!(
            "Requesting '{}' from OpenAI model {} for {}",
            request.schema_name,
            self.model,
            request.image.describe()
        );

        let response = self.http.chat_completion(&self.build_request(request)).await?;

        let message = response
            .choices
            .first()
            .map(|choice| &choice.message)
            .ok_or_else(|| Error::AiProvider("No choices in OpenAI response".to_string()))?;

        if let Some(refusal) = &message.refusal {
            return Err(Error::AiProvider(format!("OpenAI refused request: {}", refusal)));
        }

        match &message.content {
            Some(ChatMessageContent::Text(text)) if !text.trim().is_empty() => Ok(text.clone()),
            _ => Err(Error::AiProvider(
                "No text content in OpenAI response".to_string(),
            )),
        }
    }
}
