use super::{AnalysisRequest, AnalyzerBackend};
use crate::analysis::macros::{macros_from_ratios, MacroTier};
use crate::analysis::{CandidateItem, ResultNormalizer};
use crate::models::{AnalyzeOutput, BackendId};
use crate::Result;
use async_trait::async_trait;

pub const STUB_CONFIDENCE: f64 = 0.1;

/// label, emoji, grams, kcal
const STUB_MEALS: &[(&str, &str, f64, f64)] = &[
    ("mixed plate", "🍽️", 300.0, 450.0),
    ("chicken and rice", "🍛", 350.0, 520.0),
    ("pasta with tomato sauce", "🍝", 300.0, 420.0),
    ("garden salad", "🥗", 200.0, 150.0),
    ("sandwich", "🥪", 200.0, 400.0),
    ("fruit bowl", "🍓", 250.0, 130.0),
];

/// 64-bit FNV-1a; stable across builds and platforms.
fn fnv1a(data: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    data.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

/// Offline last resort: a plausible generic meal chosen deterministically
/// from the image reference. Never fails.
pub struct StubBackend {
    normalizer: ResultNormalizer,
}

impl StubBackend {
    pub fn new(normalizer: ResultNormalizer) -> Self {
        Self { normalizer }
    }

    fn candidate(request: &AnalysisRequest) -> CandidateItem {
        let index = (fnv1a(request.image.fingerprint()) % STUB_MEALS.len() as u64) as usize;
        let (label, emoji, weight_grams, calories) = STUB_MEALS[index];

        let mut evidence = vec![format!("backend:{}", BackendId::Stub)];
        let macros = macros_from_ratios(label, weight_grams, calories);
        if macros.is_some() {
            evidence.push(MacroTier::Ratio.tag().to_string());
        }

        CandidateItem {
            label: Some(label.to_string()),
            confidence: Some(STUB_CONFIDENCE),
            calories: Some(calories),
            weight_grams: Some(weight_grams),
            macro_tier: macros.as_ref().map(|_| MacroTier::Ratio),
            macros,
            emoji: Some(emoji.to_string()),
            evidence,
            ..CandidateItem::default()
        }
    }
}

#[async_trait]
impl AnalyzerBackend for StubBackend {
    fn id(&self) -> BackendId {
        BackendId::Stub
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeOutput> {
        let candidate = Self::candidate(request);
        tracing::info!(
            "Stub analysis for {}: {}",
            request.image.describe(),
            candidate.label.as_deref().unwrap_or_default()
        );
        Ok(AnalyzeOutput {
            items: vec![self.normalizer.normalize_item(BackendId::Stub, candidate)],
            meta: None,
        })
    }
}
