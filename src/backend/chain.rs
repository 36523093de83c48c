use super::{AnalysisRequest, AnalyzerBackend, PipelineBackend, StubBackend};
use crate::ai::{GeminiVisionClient, OpenAiVisionClient, VisionModel};
use crate::analysis::{MacroCalculator, ResultNormalizer};
use crate::models::{AnalyzeOutput, BackendId, Config, Meta};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Ordered list of backends tried one after another until one succeeds.
///
/// No backend is retried and no two run concurrently.
pub struct FallbackChain {
    backends: Vec<Arc<dyn AnalyzerBackend>>,
}

impl FallbackChain {
    pub fn new(backends: Vec<Arc<dyn AnalyzerBackend>>) -> Self {
        Self { backends }
    }

    /// Managed backend if its key is set, vision backend if its key is set,
    /// then the stub.
    pub fn from_config(config: &Config, macros: MacroCalculator) -> Self {
        let normalizer = ResultNormalizer::new(config);
        // One connection pool shared by both providers.
        let http_client = reqwest::Client::new();
        let mut backends: Vec<Arc<dyn AnalyzerBackend>> = Vec::new();

        if let Some(api_key) = &config.managed_api_key {
            info!("Managed backend: Gemini (model: {})", config.managed_model);
            let model: Arc<dyn VisionModel> = Arc::new(
                GeminiVisionClient::new_with_client(
                    api_key.clone(),
                    config.managed_model.clone(),
                    config.backend_timeout,
                    http_client.clone(),
                )
                .with_base_url(config.managed_endpoint.clone()),
            );
            backends.push(Arc::new(PipelineBackend::new(
                BackendId::Managed,
                model,
                macros.clone(),
                normalizer.clone(),
            )));
        } else {
            info!("MANAGED_API_KEY not set; managed backend disabled");
        }

        if let Some(api_key) = &config.inference_api_key {
            info!("Vision backend: OpenAI-compatible (model: {})", config.inference_model);
            let model: Arc<dyn VisionModel> = Arc::new(
                OpenAiVisionClient::new_with_client(
                    api_key.clone(),
                    config.inference_model.clone(),
                    config.backend_timeout,
                    http_client,
                )
                .with_base_url(config.inference_endpoint.clone()),
            );
            backends.push(Arc::new(PipelineBackend::new(
                BackendId::Vision,
                model,
                macros,
                normalizer.clone(),
            )));
        } else {
            info!("INFERENCE_API_KEY not set; vision backend disabled");
        }

        backends.push(Arc::new(StubBackend::new(normalizer)));
        Self::new(backends)
    }

    pub fn backend_ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeOutput> {
        let started = Instant::now();
        let mut used = Vec::with_capacity(self.backends.len());
        let mut last_error = None;

        for backend in &self.backends {
            let id = backend.id();
            used.push(id);
            info!("Trying backend '{}' ({}/{})", id, used.len(), self.backends.len());

            match backend.analyze(request).await {
                Ok(mut output) => {
                    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    info!("Backend '{}' succeeded in {}ms", id, latency_ms);
                    output.meta = Some(Meta {
                        is_fallback: Some(used.len() > 1),
                        used,
                        latency_ms: Some(latency_ms),
                    });
                    return Ok(output);
                }
                Err(e) => {
                    warn!("Backend '{}' failed: {}", id, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        error!("All {} analyzer backends failed", used.len());
        Err(Error::AllBackendsFailed {
            attempted: used,
            last_error: last_error.unwrap_or_else(|| "No analyzer backends configured".to_string()),
        })
    }
}
