//! Whole-pipeline analyzer backends and the fallback chain over them.

mod chain;
mod pipeline;
mod stub;

pub use chain::FallbackChain;
pub use pipeline::PipelineBackend;
pub use stub::StubBackend;

use crate::models::{AnalyzeInput, AnalyzeOutput, BackendId};
use crate::source::ImageSource;
use crate::Result;
use async_trait::async_trait;

/// A validated analysis request, shared by every backend in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub image: ImageSource,
    pub region: Option<String>,
}

impl AnalysisRequest {
    pub fn from_input(input: &AnalyzeInput) -> Result<Self> {
        Ok(Self {
            image: ImageSource::from_input(input)?,
            region: input
                .region
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

#[async_trait]
pub trait AnalyzerBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Produce a normalized result; `meta` is filled in by the chain.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeOutput>;
}
