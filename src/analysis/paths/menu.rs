use super::{attach_macros, nullable_number, weight_from_calories, PathRunner};
use crate::analysis::labels::sanitize_label;
use crate::analysis::{macros_from_parts, non_negative, positive, CandidateItem};
use crate::models::MenuItem;
use crate::prompts::{self, MENU_USER};
use crate::source::ImageSource;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::json;

pub const MENU_SCHEMA_NAME: &str = "menu_item";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMenuItem {
    restaurant: Option<String>,
    item_name: Option<String>,
    calories: Option<f64>,
    confidence: Option<f64>,
    weight_grams: Option<f64>,
    protein_g: Option<f64>,
    carbs_g: Option<f64>,
    fat_g: Option<f64>,
}

fn menu_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "restaurant": { "type": "string" },
            "itemName": { "type": "string" },
            "calories": { "type": "number" },
            "confidence": { "type": "number" },
            "weightGrams": nullable_number(),
            "proteinG": nullable_number(),
            "carbsG": nullable_number(),
            "fatG": nullable_number()
        },
        "required": [
            "restaurant", "itemName", "calories", "confidence",
            "weightGrams", "proteinG", "carbsG", "fatG"
        ],
        "additionalProperties": false
    })
}

impl PathRunner<'_> {
    pub(super) async fn run_menu(
        &self,
        image: &ImageSource,
        restaurant: &str,
        region: Option<&str>,
    ) -> Result<CandidateItem> {
        let user = prompts::render(MENU_USER, &[("restaurant", restaurant)]);
        let raw: RawMenuItem = self
            .request(image, MENU_SCHEMA_NAME, user, menu_schema(), region)
            .await?;

        let item_name = raw
            .item_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::PathExecution("Menu item has no name".to_string()))?;
        let calories = non_negative(raw.calories).ok_or_else(|| {
            Error::PathExecution(format!("No published calories for '{}'", item_name))
        })?;
        // The classifier's chain name is authoritative; the model's spelling
        // only fills a blank.
        let restaurant = Some(restaurant.trim())
            .filter(|s| !s.is_empty())
            .or(raw.restaurant.as_deref().map(str::trim))
            .unwrap_or_default()
            .to_string();

        let label = sanitize_label(&item_name);
        let weight_grams = positive(raw.weight_grams).or(weight_from_calories(Some(calories)));

        let reported = macros_from_parts(raw.protein_g, raw.carbs_g, raw.fat_g, None);
        let resolved = self
            .resolve_macros(&label, reported, "macros:model", weight_grams, Some(calories))
            .await;

        tracing::debug!("Menu match: {} / {} ({} kcal)", restaurant, item_name, calories);

        let mut candidate = CandidateItem {
            label: Some(label),
            confidence: raw.confidence,
            calories: Some(calories),
            weight_grams,
            menu_item: Some(MenuItem {
                restaurant,
                item_name,
                calories,
            }),
            ..CandidateItem::default()
        };
        attach_macros(&mut candidate, resolved);
        Ok(candidate)
    }
}
