//! Tiered macronutrient estimation.
//!
//! Tiers, first success wins:
//! 1. priors store: reference values per 100 g scaled to the portion weight
//! 2. ratios: split total calories by a food-category energy ratio
//! 3. unknown: `None`, which consumers must read as "not computed"

use crate::models::{round1, Macros, KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};
use crate::priors::{FoodPrior, PriorsStore};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroTier {
    Priors,
    Ratio,
}

impl MacroTier {
    pub fn tag(self) -> &'static str {
        match self {
            MacroTier::Priors => "macros:priors",
            MacroTier::Ratio => "macros:ratio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroEstimate {
    pub macros: Macros,
    pub tier: MacroTier,
}

/// Share of total energy attributed to each macronutrient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroRatios {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodCategory {
    ProteinDominant,
    CarbDominant,
    Produce,
    Default,
}

const PROTEIN_KEYWORDS: &[&str] = &["chicken", "beef", "fish", "meat"];
const CARB_KEYWORDS: &[&str] = &["rice", "pasta", "bread"];
const PRODUCE_KEYWORDS: &[&str] = &[
    "salad", "vegetable", "veggie", "fruit", "apple", "banana", "berr", "orange", "grape",
    "melon", "broccoli", "spinach", "lettuce", "carrot", "tomato", "cucumber",
];

impl FoodCategory {
    pub fn of(label: &str) -> Self {
        let label = label.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| label.contains(k));
        if has(PROTEIN_KEYWORDS) {
            FoodCategory::ProteinDominant
        } else if has(CARB_KEYWORDS) {
            FoodCategory::CarbDominant
        } else if has(PRODUCE_KEYWORDS) {
            FoodCategory::Produce
        } else {
            FoodCategory::Default
        }
    }

    pub fn ratios(self) -> MacroRatios {
        let (protein, carbs, fat) = match self {
            FoodCategory::ProteinDominant => (0.30, 0.00, 0.20),
            FoodCategory::CarbDominant => (0.10, 0.75, 0.15),
            FoodCategory::Produce => (0.20, 0.60, 0.20),
            FoodCategory::Default => (0.15, 0.55, 0.30),
        };
        MacroRatios {
            protein,
            carbs,
            fat,
        }
    }
}

/// Tier 1: scale a per-100 g prior to `weight_grams`.
pub fn macros_from_prior(prior: &FoodPrior, weight_grams: f64) -> Option<Macros> {
    if !(weight_grams > 0.0) {
        return None;
    }
    let scale = weight_grams / 100.0;
    Some(Macros {
        protein_g: round1(prior.protein_g * scale),
        carbs_g: round1(prior.carbs_g * scale),
        fat_g: round1(prior.fat_g * scale),
        fiber_g: prior.fiber_g.map(|f| round1(f * scale)),
    })
}

/// Tier 2: split `calories` by the label's category ratios.
pub fn macros_from_ratios(label: &str, weight_grams: f64, calories: f64) -> Option<Macros> {
    if !(weight_grams > 0.0 && calories > 0.0) {
        return None;
    }
    let ratios = FoodCategory::of(label).ratios();
    Some(Macros {
        protein_g: round1(calories * ratios.protein / KCAL_PER_G_PROTEIN),
        carbs_g: round1(calories * ratios.carbs / KCAL_PER_G_CARBS),
        fat_g: round1(calories * ratios.fat / KCAL_PER_G_FAT),
        fiber_g: None,
    })
}

/// Run the tiers against an already looked-up prior.
pub fn compute_macros(
    prior: Option<&FoodPrior>,
    label: &str,
    weight_grams: f64,
    calories: f64,
) -> Option<MacroEstimate> {
    if let Some(macros) = prior.and_then(|p| macros_from_prior(p, weight_grams)) {
        return Some(MacroEstimate {
            macros,
            tier: MacroTier::Priors,
        });
    }
    macros_from_ratios(label, weight_grams, calories).map(|macros| MacroEstimate {
        macros,
        tier: MacroTier::Ratio,
    })
}

/// Macro estimation backed by a read-only priors store.
#[derive(Clone)]
pub struct MacroCalculator {
    store: Arc<dyn PriorsStore>,
}

impl MacroCalculator {
    pub fn new(store: Arc<dyn PriorsStore>) -> Self {
        Self { store }
    }

    /// Store lookup; a failing store counts as a miss.
    pub async fn prior(&self, label: &str) -> Option<FoodPrior> {
        match self.store.lookup(label).await {
            Ok(prior) => prior,
            Err(e) => {
                tracing::warn!("Priors lookup for '{}' failed: {}", label, e);
                None
            }
        }
    }

    pub async fn calculate(
        &self,
        label: &str,
        weight_grams: f64,
        calories: f64,
    ) -> Option<MacroEstimate> {
        let prior = self.prior(label).await;
        let estimate = compute_macros(prior.as_ref(), label, weight_grams, calories);
        match &estimate {
            Some(e) => tracing::debug!("Macros for '{}' from {:?} tier", label, e.tier),
            None => tracing::debug!("Macros for '{}' unknown", label),
        }
        estimate
    }
}
