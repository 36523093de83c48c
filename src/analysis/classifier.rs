//! Image type classification
//!
//! One structured call to the vision model decides which evidence regime
//! (packaged / restaurant / prepared) applies. No retries here; a failure
//! surfaces as [`Error::Classification`] and the fallback chain moves on.
//! A verdict needs both `imageType` and `confidence`.

use super::normalizer::clamp_confidence;
use super::parse_model_json;
use crate::ai::{VisionModel, VisionRequest};
use crate::models::{ImageType, ImageTypeResult};
use crate::prompts::{self, ANALYST_SYSTEM, CLASSIFY_USER};
use crate::source::ImageSource;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const CLASSIFY_SCHEMA_NAME: &str = "image_type";
const CLASSIFY_MAX_TOKENS: u32 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClassification {
    image_type: Option<String>,
    confidence: Option<f64>,
    reasoning: Option<String>,
    restaurant_name: Option<String>,
    brand_name: Option<String>,
}

fn classify_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "imageType": { "type": "string", "enum": ["packaged", "restaurant", "prepared"] },
            "confidence": { "type": "number" },
            "reasoning": { "type": "string" },
            "restaurantName": { "type": ["string", "null"] },
            "brandName": { "type": ["string", "null"] }
        },
        "required": ["imageType", "confidence", "reasoning", "restaurantName", "brandName"],
        "additionalProperties": false
    })
}

fn parse_image_type(value: &str) -> Option<ImageType> {
    match value.trim().to_lowercase().as_str() {
        "packaged" => Some(ImageType::Packaged),
        "restaurant" => Some(ImageType::Restaurant),
        "prepared" => Some(ImageType::Prepared),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct ImageTypeClassifier {
    model: Arc<dyn VisionModel>,
}

impl ImageTypeClassifier {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    pub async fn classify(
        &self,
        image: &ImageSource,
        region: Option<&str>,
    ) -> Result<ImageTypeResult> {
        let request = VisionRequest {
            schema_name: CLASSIFY_SCHEMA_NAME,
            system: ANALYST_SYSTEM.to_string(),
            user: prompts::with_region(CLASSIFY_USER.to_string(), region),
            image,
            schema: classify_schema(),
            max_tokens: CLASSIFY_MAX_TOKENS,
        };

        let text = self
            .model
            .generate_json(&request)
            .await
            .map_err(|e| Error::Classification(e.to_string()))?;

        let result = Self::interpret(&text)?;
        tracing::info!(
            "Classified {} as {} ({:.2}) via {}",
            image.describe(),
            result.image_type,
            result.confidence,
            self.model.provider()
        );
        Ok(result)
    }

    fn interpret(text: &str) -> Result<ImageTypeResult> {
        let raw: RawClassification =
            parse_model_json(text, CLASSIFY_SCHEMA_NAME).map_err(Error::Classification)?;

        let value = raw
            .image_type
            .ok_or_else(|| Error::Classification("Response omitted imageType".to_string()))?;
        let image_type = parse_image_type(&value).ok_or_else(|| {
            Error::Classification(format!("Unknown imageType '{}'", value))
        })?;

        let confidence = raw
            .confidence
            .filter(|c| !c.is_nan())
            .ok_or_else(|| Error::Classification("Response omitted confidence".to_string()))?;

        Ok(ImageTypeResult {
            image_type,
            confidence: clamp_confidence(Some(confidence)),
            reasoning: raw.reasoning.unwrap_or_default(),
            restaurant_name: non_blank(raw.restaurant_name),
            brand_name: non_blank(raw.brand_name),
        })
    }
}
