//! Calorie reconciliation between a path's raw total and its macros.

use super::labels::fallback_calories;
use crate::models::Macros;

/// Macro-derived totals below this are not trusted over a raw figure.
pub const MIN_PLAUSIBLE_KCAL: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalorieSource {
    Macros,
    Raw,
    Table,
}

impl CalorieSource {
    pub fn tag(self) -> &'static str {
        match self {
            CalorieSource::Macros => "calories:macros",
            CalorieSource::Raw => "calories:raw",
            CalorieSource::Table => "calories:table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub calories: f64,
    pub source: CalorieSource,
}

/// Pick the calorie figure for an item.
///
/// The macro-derived figure wins when it clears [`MIN_PLAUSIBLE_KCAL`] and
/// the raw figure is missing, implausibly low, or less than twice it.
/// A NaN or negative raw figure counts as missing.
pub fn reconcile_calories(raw: Option<f64>, macros: Option<&Macros>, label: &str) -> Reconciled {
    let raw = raw.filter(|c| c.is_finite() && *c >= 0.0);
    let from_macros = macros.filter(|m| m.is_valid()).map(Macros::calories);

    if let Some(cfm) = from_macros {
        let plausible = cfm >= MIN_PLAUSIBLE_KCAL
            && match raw {
                None => true,
                Some(raw) => raw < MIN_PLAUSIBLE_KCAL || cfm > raw * 0.5,
            };
        if plausible {
            return Reconciled {
                calories: cfm,
                source: CalorieSource::Macros,
            };
        }
    }

    match (raw, from_macros) {
        (Some(raw), _) => Reconciled {
            calories: raw,
            source: CalorieSource::Raw,
        },
        (None, Some(cfm)) if cfm > 0.0 => Reconciled {
            calories: cfm,
            source: CalorieSource::Macros,
        },
        _ => Reconciled {
            calories: fallback_calories(label),
            source: CalorieSource::Table,
        },
    }
}
