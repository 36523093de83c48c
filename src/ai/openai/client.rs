use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::ai::http::send_json;
use crate::Result;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Chat-completions transport for any OpenAI-compatible gateway.
pub struct OpenAiHttpClient {
    client: Client,
    bearer: String,
    completions_url: String,
    timeout: Duration,
}

impl OpenAiHttpClient {
    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            bearer: format!("Bearer {}", api_key),
            completions_url: format!("{}{}", DEFAULT_BASE_URL, CHAT_COMPLETIONS_PATH),
            timeout,
        }
    }

    /// Point at another gateway; a trailing slash is tolerated.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.completions_url = format!("{}{}", base_url.trim_end_matches('/'), CHAT_COMPLETIONS_PATH);
        self
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        let builder = self
            .client
            .post(&self.completions_url)
            .timeout(self.timeout)
            .header(reqwest::header::AUTHORIZATION, &self.bearer)
            .json(request);
        send_json("OpenAI", builder).await
    }
}
