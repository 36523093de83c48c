//! Inference service integration
//!
//! The analyzer treats a vision-capable model as a narrow capability: send an
//! image plus instructions and a JSON schema, get JSON text back. Callers own
//! the schema validation of what comes back.

pub mod gemini;
mod http;
pub mod mime;
pub mod mock;
pub mod openai;

pub use gemini::GeminiVisionClient;
pub use mock::MockVisionModel;
pub use openai::OpenAiVisionClient;

use crate::source::ImageSource;
use crate::Result;
use async_trait::async_trait;

/// One structured-output request against a vision model.
#[derive(Debug, Clone)]
pub struct VisionRequest<'a> {
    /// Short identifier for the schema; also used as the structured-output name.
    pub schema_name: &'static str,
    pub system: String,
    pub user: String,
    pub image: &'a ImageSource,
    pub schema: serde_json::Value,
    pub max_tokens: u32,
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider label used in logs.
    fn provider(&self) -> &'static str;

    /// Returns the raw JSON text the model produced for `request`.
    async fn generate_json(&self, request: &VisionRequest<'_>) -> Result<String>;

    /// Resolve `image` into the form this provider sends, once per analysis.
    async fn prepare_image(&self, image: &ImageSource) -> Result<ImageSource> {
        Ok(image.clone())
    }
}

/// Strip a Markdown code fence some models wrap around JSON output.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
