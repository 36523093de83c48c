use super::{attach_macros, nullable_number, PathRunner};
use crate::analysis::labels::sanitize_label;
use crate::analysis::{macros_from_parts, non_negative, positive, CandidateItem};
use crate::models::{Gaussian, GeometryPriors};
use crate::priors::FoodPrior;
use crate::prompts::GEOMETRY_USER;
use crate::source::ImageSource;
use crate::Result;
use serde::Deserialize;
use serde_json::json;

pub const GEOMETRY_SCHEMA_NAME: &str = "geometry_estimate";

/// Relative standard deviations applied to point estimates.
const DENSITY_SIGMA_FRACTION: f64 = 0.15;
const KCAL_PER_G_SIGMA_FRACTION: f64 = 0.20;

/// Water-like density and a mixed-plate energy density.
const DEFAULT_DENSITY: f64 = 1.0;
const DEFAULT_KCAL_PER_G: f64 = 2.5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGeometry {
    label: Option<String>,
    confidence: Option<f64>,
    #[serde(rename = "volumeML")]
    volume_ml: Option<f64>,
    density: Option<f64>,
    kcal_per_g: Option<f64>,
    weight_grams: Option<f64>,
    total_calories: Option<f64>,
    protein_g: Option<f64>,
    carbs_g: Option<f64>,
    fat_g: Option<f64>,
    fiber_g: Option<f64>,
}

fn geometry_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "label": { "type": "string" },
            "confidence": { "type": "number" },
            "volumeML": nullable_number(),
            "density": nullable_number(),
            "kcalPerG": nullable_number(),
            "weightGrams": nullable_number(),
            "totalCalories": nullable_number(),
            "proteinG": nullable_number(),
            "carbsG": nullable_number(),
            "fatG": nullable_number(),
            "fiberG": nullable_number()
        },
        "required": [
            "label", "confidence", "volumeML", "density", "kcalPerG", "weightGrams",
            "totalCalories", "proteinG", "carbsG", "fatG", "fiberG"
        ],
        "additionalProperties": false
    })
}

/// Stored priors win over the model's point estimates; point estimates get
/// the fixed relative sigmas.
fn geometry_priors(
    stored: Option<&FoodPrior>,
    density: Option<f64>,
    kcal_per_g: Option<f64>,
) -> GeometryPriors {
    let density = stored.and_then(|p| p.density).unwrap_or_else(|| {
        Gaussian::with_relative_sigma(density.unwrap_or(DEFAULT_DENSITY), DENSITY_SIGMA_FRACTION)
    });
    let kcal_per_g = stored
        .and_then(|p| p.kcal_per_g)
        .unwrap_or_else(|| {
            let mu = stored
                .map(FoodPrior::energy_density_mu)
                .filter(|mu| *mu > 0.0)
                .or(kcal_per_g)
                .unwrap_or(DEFAULT_KCAL_PER_G);
            Gaussian::with_relative_sigma(mu, KCAL_PER_G_SIGMA_FRACTION)
        });
    GeometryPriors {
        kcal_per_g,
        density,
    }
}

impl PathRunner<'_> {
    pub(super) async fn run_geometry(
        &self,
        image: &ImageSource,
        region: Option<&str>,
    ) -> Result<CandidateItem> {
        let raw: RawGeometry = self
            .request(
                image,
                GEOMETRY_SCHEMA_NAME,
                GEOMETRY_USER.to_string(),
                geometry_schema(),
                region,
            )
            .await?;

        let label = sanitize_label(raw.label.as_deref().unwrap_or_default());
        let stored = self.macros.prior(&label).await;
        let priors = geometry_priors(stored.as_ref(), positive(raw.density), positive(raw.kcal_per_g));

        let volume = positive(raw.volume_ml);
        let reported_calories = non_negative(raw.total_calories);
        let weight_grams = positive(raw.weight_grams)
            .or(volume.map(|v| v * priors.density.mu))
            .or(reported_calories
                .filter(|c| *c > 0.0)
                .map(|c| c / priors.kcal_per_g.mu));
        let calories = reported_calories.or(weight_grams.map(|w| w * priors.kcal_per_g.mu));
        let volume_ml = volume.or(weight_grams.map(|w| w / priors.density.mu));

        let reported = macros_from_parts(raw.protein_g, raw.carbs_g, raw.fat_g, raw.fiber_g);
        let resolved = self
            .resolve_macros(&label, reported, "macros:model", weight_grams, calories)
            .await;

        let mut candidate = CandidateItem {
            label: Some(label),
            confidence: raw.confidence,
            calories,
            weight_grams,
            volume_ml,
            priors: Some(priors),
            ..CandidateItem::default()
        };
        if stored.is_some() {
            candidate.evidence.push("priors:store".to_string());
        }
        attach_macros(&mut candidate, resolved);
        Ok(candidate)
    }
}
