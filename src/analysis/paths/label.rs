use super::{attach_macros, nullable_number, nullable_string, weight_from_calories, PathRunner};
use crate::analysis::labels::sanitize_label;
use crate::analysis::{macros_from_parts, non_negative, positive, CandidateItem};
use crate::models::NutritionLabel;
use crate::prompts::LABEL_USER;
use crate::source::ImageSource;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::json;

pub const LABEL_SCHEMA_NAME: &str = "nutrition_label";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLabel {
    label: Option<String>,
    confidence: Option<f64>,
    calories: Option<f64>,
    serving_size: Option<String>,
    calories_per_serving: Option<f64>,
    total_servings: Option<f64>,
    weight_grams: Option<f64>,
    protein_g: Option<f64>,
    carbs_g: Option<f64>,
    fat_g: Option<f64>,
    fiber_g: Option<f64>,
}

fn label_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "label": { "type": "string" },
            "confidence": { "type": "number" },
            "calories": nullable_number(),
            "servingSize": nullable_string(),
            "caloriesPerServing": nullable_number(),
            "totalServings": nullable_number(),
            "weightGrams": nullable_number(),
            "proteinG": nullable_number(),
            "carbsG": nullable_number(),
            "fatG": nullable_number(),
            "fiberG": nullable_number()
        },
        "required": [
            "label", "confidence", "calories", "servingSize", "caloriesPerServing",
            "totalServings", "weightGrams", "proteinG", "carbsG", "fatG", "fiberG"
        ],
        "additionalProperties": false
    })
}

impl PathRunner<'_> {
    pub(super) async fn run_label(
        &self,
        image: &ImageSource,
        region: Option<&str>,
    ) -> Result<CandidateItem> {
        let raw: RawLabel = self
            .request(image, LABEL_SCHEMA_NAME, LABEL_USER.to_string(), label_schema(), region)
            .await?;

        let per_serving = non_negative(raw.calories_per_serving);
        let calories = non_negative(raw.calories).or(per_serving).ok_or_else(|| {
            Error::PathExecution("Nutrition label has no readable calories".to_string())
        })?;

        let label = sanitize_label(raw.label.as_deref().unwrap_or_default());
        let weight_grams = positive(raw.weight_grams).or(weight_from_calories(Some(calories)));

        let nutrition_label = NutritionLabel {
            serving_size: raw
                .serving_size
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "1 serving".to_string()),
            calories_per_serving: per_serving.unwrap_or(calories),
            total_servings: positive(raw.total_servings),
        };

        let reported = macros_from_parts(raw.protein_g, raw.carbs_g, raw.fat_g, raw.fiber_g);
        let resolved = self
            .resolve_macros(&label, reported, "macros:label", weight_grams, Some(calories))
            .await;

        let mut candidate = CandidateItem {
            label: Some(label),
            confidence: raw.confidence,
            calories: Some(calories),
            weight_grams,
            nutrition_label: Some(nutrition_label),
            ..CandidateItem::default()
        };
        attach_macros(&mut candidate, resolved);
        Ok(candidate)
    }
}
