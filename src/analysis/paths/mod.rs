//! Evidence paths
//!
//! Exactly one path runs per analysis, chosen from the classifier verdict:
//!
//! | verdict                          | path     |
//! |----------------------------------|----------|
//! | `packaged`                       | label    |
//! | `restaurant` with a chain name   | menu     |
//! | `restaurant` without a name      | geometry |
//! | `prepared`                       | geometry |

mod geometry;
mod label;
mod menu;

pub use geometry::GEOMETRY_SCHEMA_NAME;
pub use label::LABEL_SCHEMA_NAME;
pub use menu::MENU_SCHEMA_NAME;

use super::macros::{MacroCalculator, MacroTier};
use super::{parse_model_json, CandidateItem};
use crate::ai::{VisionModel, VisionRequest};
use crate::models::{EvidencePath, ImageType, ImageTypeResult, Macros};
use crate::prompts::{self, ANALYST_SYSTEM};
use crate::source::ImageSource;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Average energy density used to back-derive a weight from calories.
pub const AVERAGE_KCAL_PER_G: f64 = 2.5;

const PATH_MAX_TOKENS: u32 = 600;

pub fn select_path(classification: &ImageTypeResult) -> EvidencePath {
    match (classification.image_type, &classification.restaurant_name) {
        (ImageType::Packaged, _) => EvidencePath::Label,
        (ImageType::Restaurant, Some(_)) => EvidencePath::Menu,
        (ImageType::Restaurant, None) | (ImageType::Prepared, _) => EvidencePath::Geometry,
    }
}

/// Weight implied by `calories` at the average energy density.
pub fn weight_from_calories(calories: Option<f64>) -> Option<f64> {
    calories
        .filter(|c| c.is_finite() && *c > 0.0)
        .map(|c| c / AVERAGE_KCAL_PER_G)
}

pub(crate) fn nullable_number() -> serde_json::Value {
    json!({ "type": ["number", "null"] })
}

pub(crate) fn nullable_string() -> serde_json::Value {
    json!({ "type": ["string", "null"] })
}

/// Runs the evidence path that matches a classifier verdict.
pub struct PathRunner<'a> {
    model: &'a dyn VisionModel,
    macros: &'a MacroCalculator,
}

impl<'a> PathRunner<'a> {
    pub fn new(model: &'a dyn VisionModel, macros: &'a MacroCalculator) -> Self {
        Self { model, macros }
    }

    pub async fn run(
        &self,
        image: &ImageSource,
        classification: &ImageTypeResult,
        region: Option<&str>,
    ) -> Result<CandidateItem> {
        let path = select_path(classification);
        tracing::debug!("Running {:?} path for {}", path, image.describe());

        let mut candidate = match (path, classification.restaurant_name.as_deref()) {
            (EvidencePath::Label, _) => self.run_label(image, region).await?,
            (EvidencePath::Menu, Some(restaurant)) => {
                self.run_menu(image, restaurant, region).await?
            }
            _ => self.run_geometry(image, region).await?,
        };

        candidate.path = Some(path);
        candidate.evidence.insert(0, path.tag().to_string());
        Ok(candidate)
    }

    /// One structured request; any failure is a path failure.
    async fn request<T: DeserializeOwned>(
        &self,
        image: &ImageSource,
        schema_name: &'static str,
        user: String,
        schema: serde_json::Value,
        region: Option<&str>,
    ) -> Result<T> {
        let request = VisionRequest {
            schema_name,
            system: ANALYST_SYSTEM.to_string(),
            user: prompts::with_region(user, region),
            image,
            schema,
            max_tokens: PATH_MAX_TOKENS,
        };

        let text = self
            .model
            .generate_json(&request)
            .await
            .map_err(|e| Error::PathExecution(format!("{}: {}", schema_name, e)))?;
        parse_model_json(&text, schema_name).map_err(Error::PathExecution)
    }

    /// Model-reported macros when complete, else the calculator tiers.
    async fn resolve_macros(
        &self,
        label: &str,
        reported: Option<Macros>,
        reported_tag: &'static str,
        weight_grams: Option<f64>,
        calories: Option<f64>,
    ) -> Option<ResolvedMacros> {
        if let Some(macros) = reported {
            return Some(ResolvedMacros {
                macros,
                tag: reported_tag,
                tier: None,
            });
        }
        self.macros
            .calculate(label, weight_grams.unwrap_or(0.0), calories.unwrap_or(0.0))
            .await
            .map(|estimate| ResolvedMacros {
                macros: estimate.macros,
                tag: estimate.tier.tag(),
                tier: Some(estimate.tier),
            })
    }
}

struct ResolvedMacros {
    macros: Macros,
    tag: &'static str,
    tier: Option<MacroTier>,
}

/// Fill `macros`, their tier and their evidence tag on a candidate.
fn attach_macros(candidate: &mut CandidateItem, resolved: Option<ResolvedMacros>) {
    if let Some(resolved) = resolved {
        candidate.macros = Some(resolved.macros);
        candidate.macro_tier = resolved.tier;
        candidate.evidence.push(resolved.tag.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(image_type: ImageType, restaurant_name: Option<&str>) -> ImageTypeResult {
        ImageTypeResult {
            image_type,
            confidence: 0.9,
            reasoning: String::new(),
            restaurant_name: restaurant_name.map(str::to_string),
            brand_name: None,
        }
    }

    #[test]
    fn test_select_path_routing_table() {
        assert_eq!(select_path(&verdict(ImageType::Packaged, None)), EvidencePath::Label);
        assert_eq!(
            select_path(&verdict(ImageType::Packaged, Some("Subway"))),
            EvidencePath::Label
        );
        assert_eq!(
            select_path(&verdict(ImageType::Restaurant, Some("Subway"))),
            EvidencePath::Menu
        );
        assert_eq!(
            select_path(&verdict(ImageType::Restaurant, None)),
            EvidencePath::Geometry
        );
        assert_eq!(select_path(&verdict(ImageType::Prepared, None)), EvidencePath::Geometry);
    }

    #[test]
    fn test_weight_from_calories() {
        assert_eq!(weight_from_calories(Some(250.0)), Some(100.0));
        assert_eq!(weight_from_calories(Some(0.0)), None);
        assert_eq!(weight_from_calories(None), None);
    }
}
