//! Application entry point for one analysis: validation, deadline, tracing.

use crate::analysis::MacroCalculator;
use crate::backend::{AnalysisRequest, FallbackChain};
use crate::models::{AnalyzeInput, AnalyzeOutput, BackendId, Config};
use crate::priors::{InMemoryPriorsStore, PriorsStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Owns the fallback chain and applies the caller-facing deadline.
pub struct App {
    chain: FallbackChain,
    request_timeout: Duration,
    started_at: DateTime<Utc>,
}

impl App {
    /// Build the priors store and every configured backend from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn PriorsStore> = match &config.priors_path {
            Some(path) => Arc::new(InMemoryPriorsStore::from_file(path)?),
            None => {
                let store = InMemoryPriorsStore::builtin()?;
                info!("Using built-in food priors ({} entries)", store.len());
                Arc::new(store)
            }
        };

        let chain = FallbackChain::from_config(config, MacroCalculator::new(store));
        Ok(Self::with_chain(chain, config.request_timeout))
    }

    /// Build an app around an existing chain; used by tests and harnesses
    /// that inject mock backends.
    pub fn with_chain(chain: FallbackChain, request_timeout: Duration) -> Self {
        Self {
            chain,
            request_timeout,
            started_at: Utc::now(),
        }
    }

    pub fn backends(&self) -> Vec<BackendId> {
        self.chain.backend_ids()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Analyze one image. Input errors are returned before any backend runs.
    pub async fn analyze(&self, input: &AnalyzeInput) -> Result<AnalyzeOutput> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", %request_id);

        async {
            let request = AnalysisRequest::from_input(input)?;
            info!("Analyzing {}", request.image.describe());

            match tokio::time::timeout(self.request_timeout, self.chain.analyze(&request)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Analysis exceeded {:?}", self.request_timeout);
                    Err(Error::Timeout(self.request_timeout.as_secs()))
                }
            }
        }
        .instrument(span)
        .await
    }
}
