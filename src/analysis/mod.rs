//! Food-image analysis engine
//!
//! Classifies an image into an evidence regime, runs the matching evidence
//! path, fills in macros, reconciles calories and normalizes the result.

pub mod classifier;
pub mod labels;
pub mod macros;
pub mod normalizer;
pub mod paths;
pub mod reconcile;

pub use classifier::ImageTypeClassifier;
pub use macros::{MacroCalculator, MacroTier};
pub use normalizer::ResultNormalizer;
pub use paths::PathRunner;

use crate::ai::strip_code_fences;
use crate::models::{
    EvidencePath, GeometryPriors, ImageType, Macros, MenuItem, NutritionLabel,
};
use serde::de::DeserializeOwned;

/// A backend's native, not yet normalized, answer for one food.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateItem {
    pub label: Option<String>,
    pub confidence: Option<f64>,
    pub calories: Option<f64>,
    pub weight_grams: Option<f64>,
    pub volume_ml: Option<f64>,
    pub macros: Option<Macros>,
    /// Calculator tier behind `macros`; `None` when the model reported them.
    pub macro_tier: Option<MacroTier>,
    pub priors: Option<GeometryPriors>,
    pub nutrition_label: Option<NutritionLabel>,
    pub menu_item: Option<MenuItem>,
    pub emoji: Option<String>,
    pub path: Option<EvidencePath>,
    pub evidence: Vec<String>,
    pub image_type: Option<ImageType>,
    pub classifier_confidence: Option<f64>,
}

/// Decode model output into `T`, tolerating a Markdown code fence.
pub(crate) fn parse_model_json<T: DeserializeOwned>(
    text: &str,
    schema_name: &str,
) -> std::result::Result<T, String> {
    serde_json::from_str(strip_code_fences(text)).map_err(|e| {
        tracing::warn!("Model output for '{}' failed validation: {}", schema_name, e);
        format!("'{}' response does not match schema: {}", schema_name, e)
    })
}

/// `Some(v)` only for finite, strictly positive values.
pub(crate) fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// `Some(v)` only for finite, non-negative values.
pub(crate) fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Build macros only when the model reported all three main fields.
pub(crate) fn macros_from_parts(
    protein_g: Option<f64>,
    carbs_g: Option<f64>,
    fat_g: Option<f64>,
    fiber_g: Option<f64>,
) -> Option<Macros> {
    let macros = Macros {
        protein_g: protein_g?,
        carbs_g: carbs_g?,
        fat_g: fat_g?,
        fiber_g: non_negative(fiber_g),
    };
    macros.is_valid().then_some(macros)
}
