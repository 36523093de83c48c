//! Maps backend candidates into the canonical output contract.

use super::labels::{fallback_emoji, lookup_hint, sanitize_label};
use super::macros::MacroTier;
use super::reconcile::reconcile_calories;
use super::{non_negative, positive, CandidateItem};
use crate::models::{round1, AnalyzeItem, AnalyzeOutput, BackendId, Config};
use crate::{Error, Result};

/// Confidence assumed when a backend gives none.
pub const DEFAULT_CONFIDENCE: f64 = 0.6;
/// Calorie uncertainty for items that came from no evidence path.
pub const STUB_SIGMA_FRACTION: f64 = 0.5;

pub fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if !c.is_nan() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    default_portion_grams: f64,
    default_weight_sigma: f64,
}

impl ResultNormalizer {
    pub fn new(config: &Config) -> Self {
        Self {
            default_portion_grams: config.default_portion_grams,
            default_weight_sigma: config.default_weight_sigma,
        }
    }

    /// Keep the highest-confidence candidate (first wins on ties) and
    /// normalize it. `meta` is left to the caller.
    pub fn normalize(&self, source: BackendId, candidates: Vec<CandidateItem>) -> Result<AnalyzeOutput> {
        let mut best: Option<(f64, CandidateItem)> = None;
        for candidate in candidates {
            let confidence = clamp_confidence(candidate.confidence);
            if best.as_ref().map_or(true, |(top, _)| confidence > *top) {
                best = Some((confidence, candidate));
            }
        }

        let (_, top) = best.ok_or_else(|| {
            Error::PathExecution(format!("Backend '{}' returned no items", source))
        })?;

        Ok(AnalyzeOutput {
            items: vec![self.normalize_item(source, top)],
            meta: None,
        })
    }

    pub fn normalize_item(&self, source: BackendId, candidate: CandidateItem) -> AnalyzeItem {
        let label = sanitize_label(candidate.label.as_deref().unwrap_or_default());
        let hint = lookup_hint(&label);

        let macros = candidate
            .macros
            .filter(|m| m.is_valid())
            .map(|m| m.rounded());
        // Ratio-tier macros are a split of the raw figure, not evidence against it.
        let independent_macros = macros
            .as_ref()
            .filter(|_| candidate.macro_tier != Some(MacroTier::Ratio));
        let reconciled = reconcile_calories(candidate.calories, independent_macros, &label);
        let calories = reconciled.calories.round();

        let weight_grams = round1(
            positive(candidate.weight_grams)
                .or(hint.map(|h| h.weight_grams))
                .unwrap_or(self.default_portion_grams),
        );
        let sigma_fraction = candidate
            .path
            .map(|p| p.sigma_fraction())
            .unwrap_or(STUB_SIGMA_FRACTION);

        let emoji = candidate
            .emoji
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| fallback_emoji(&label).to_string());

        let mut evidence = candidate.evidence;
        evidence.push(reconciled.source.tag().to_string());

        AnalyzeItem {
            confidence: clamp_confidence(candidate.confidence),
            calories,
            sigma_calories: round1(calories * sigma_fraction),
            weight_grams,
            sigma_weight_grams: round1(weight_grams * self.default_weight_sigma),
            volume_ml: round1(non_negative(candidate.volume_ml).unwrap_or(0.0)),
            priors: candidate.priors,
            macros,
            evidence,
            nutrition_label: candidate.nutrition_label,
            menu_item: candidate.menu_item,
            emoji: Some(emoji),
            path: candidate.path,
            analyzer_source: source,
            image_type: candidate.image_type,
            classifier_confidence: candidate.classifier_confidence,
            label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::macros::macros_from_ratios;
    use crate::models::{EvidencePath, Macros};
    use pretty_assertions::assert_eq;

    fn normalizer() -> ResultNormalizer {
        ResultNormalizer::new(&Config::default())
    }

    fn candidate(label: &str, confidence: Option<f64>) -> CandidateItem {
        CandidateItem {
            label: Some(label.to_string()),
            confidence,
            calories: Some(200.0),
            weight_grams: Some(100.0),
            path: Some(EvidencePath::Geometry),
            ..CandidateItem::default()
        }
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(Some(1.7)), 1.0);
        assert_eq!(clamp_confidence(Some(-0.2)), 0.0);
        assert_eq!(clamp_confidence(Some(f64::NAN)), DEFAULT_CONFIDENCE);
        assert_eq!(clamp_confidence(None), DEFAULT_CONFIDENCE);
        assert_eq!(clamp_confidence(Some(0.42)), 0.42);
    }

    #[test]
    fn test_picks_top_candidate_first_on_ties() {
        let output = normalizer()
            .normalize(
                BackendId::Vision,
                vec![
                    candidate("toast", Some(0.4)),
                    candidate("oatmeal", Some(0.9)),
                    candidate("cereal", Some(0.9)),
                ],
            )
            .unwrap();
        assert_eq!(output.items.len(), 1);
        assert_eq!(output.items[0].label, "oatmeal");
        assert!(output.meta.is_none());
    }

    #[test]
    fn test_empty_candidate_list_is_an_error() {
        let err = normalizer().normalize(BackendId::Managed, vec![]).unwrap_err();
        assert!(matches!(err, Error::PathExecution(_)));
    }

    #[test]
    fn test_full_item_normalization() {
        let item = normalizer().normalize_item(
            BackendId::Vision,
            CandidateItem {
                label: Some("Grilled_Steak.jpg".to_string()),
                confidence: Some(1.4),
                calories: Some(100.0),
                weight_grams: Some(180.04),
                macros: Some(Macros {
                    protein_g: 30.04,
                    carbs_g: 0.0,
                    fat_g: 20.0,
                    fiber_g: None,
                }),
                path: Some(EvidencePath::Geometry),
                evidence: vec!["path:geometry".to_string()],
                ..CandidateItem::default()
            },
        );

        assert_eq!(item.label, "grilled steak");
        assert_eq!(item.confidence, 1.0);
        assert_eq!(item.calories, 300.0);
        assert_eq!(item.sigma_calories, 45.0);
        assert_eq!(item.weight_grams, 180.0);
        assert_eq!(item.sigma_weight_grams, 45.0);
        assert_eq!(item.volume_ml, 0.0);
        assert_eq!(item.macros.unwrap().protein_g, 30.0);
        assert_eq!(item.emoji.as_deref(), Some("🥩"));
        assert_eq!(
            item.evidence,
            vec!["path:geometry".to_string(), "calories:macros".to_string()]
        );
    }

    #[test]
    fn test_missing_values_fall_back_to_tables_and_defaults() {
        let item = normalizer().normalize_item(
            BackendId::Stub,
            CandidateItem {
                label: Some("Banana".to_string()),
                ..CandidateItem::default()
            },
        );
        assert_eq!(item.calories, 105.0);
        assert_eq!(item.weight_grams, 120.0);
        assert_eq!(item.sigma_calories, 52.5);
        assert_eq!(item.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(item.evidence, vec!["calories:table".to_string()]);

        let item = normalizer().normalize_item(BackendId::Stub, CandidateItem::default());
        assert_eq!(item.label, "unknown_food");
        assert_eq!(item.weight_grams, 250.0);
        assert_eq!(item.emoji.as_deref(), Some("🍽️"));
    }

    #[test]
    fn test_backend_values_are_not_overridden_by_hints() {
        let item = normalizer().normalize_item(
            BackendId::Managed,
            CandidateItem {
                label: Some("pizza".to_string()),
                calories: Some(285.0),
                weight_grams: Some(107.0),
                emoji: Some("🫓".to_string()),
                path: Some(EvidencePath::Menu),
                ..CandidateItem::default()
            },
        );
        assert_eq!(item.calories, 285.0);
        assert_eq!(item.weight_grams, 107.0);
        assert_eq!(item.emoji.as_deref(), Some("🫓"));
        assert_eq!(item.sigma_calories, 28.5);
    }

    #[test]
    fn test_invalid_macros_are_dropped() {
        let item = normalizer().normalize_item(
            BackendId::Vision,
            CandidateItem {
                label: Some("soup".to_string()),
                calories: Some(180.0),
                macros: Some(Macros {
                    protein_g: -3.0,
                    carbs_g: 10.0,
                    fat_g: 2.0,
                    fiber_g: None,
                }),
                path: Some(EvidencePath::Geometry),
                ..CandidateItem::default()
            },
        );
        assert!(item.macros.is_none());
        assert_eq!(item.calories, 180.0);
    }

    #[test]
    fn test_ratio_macros_never_replace_their_own_calories() {
        for kcal in [246.0, 247.0, 500.0] {
            let item = normalizer().normalize_item(
                BackendId::Vision,
                CandidateItem {
                    label: Some("chicken breast".to_string()),
                    calories: Some(kcal),
                    weight_grams: Some(150.0),
                    macros: macros_from_ratios("chicken breast", 150.0, kcal),
                    macro_tier: Some(MacroTier::Ratio),
                    path: Some(EvidencePath::Menu),
                    ..CandidateItem::default()
                },
            );
            assert_eq!(item.calories, kcal);
            assert_eq!(item.evidence.last().map(String::as_str), Some("calories:raw"));
            assert!(item.macros.is_some());
        }
    }

    #[test]
    fn test_priors_macros_still_reconcile() {
        let item = normalizer().normalize_item(
            BackendId::Vision,
            CandidateItem {
                label: Some("grilled chicken".to_string()),
                calories: Some(100.0),
                weight_grams: Some(150.0),
                macros: Some(Macros {
                    protein_g: 46.5,
                    carbs_g: 0.0,
                    fat_g: 5.4,
                    fiber_g: None,
                }),
                macro_tier: Some(MacroTier::Priors),
                path: Some(EvidencePath::Geometry),
                ..CandidateItem::default()
            },
        );
        assert_eq!(item.calories, 235.0);
        assert_eq!(item.evidence.last().map(String::as_str), Some("calories:macros"));
    }
}
