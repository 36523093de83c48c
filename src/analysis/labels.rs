//! Label sanitization and last-resort food hints.
//!
//! The hint table is matched by substring and is only consulted when a
//! backend left a value empty; it never overrides backend-supplied data.

pub const UNKNOWN_FOOD: &str = "unknown_food";
pub const DEFAULT_EMOJI: &str = "🍽️";
/// Calories assumed for an unidentifiable meal.
pub const DEFAULT_MEAL_CALORIES: f64 = 300.0;

/// Canonical label: lower-case words separated by single spaces.
///
/// Sanitizing an already-sanitized label returns it unchanged.
pub fn sanitize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == UNKNOWN_FOOD {
        return UNKNOWN_FOOD.to_string();
    }

    let stem = strip_extension(trimmed);
    let mut cleaned = String::with_capacity(stem.len());
    for c in stem.chars() {
        match c {
            '\'' | '’' => {}
            c if c.is_alphanumeric() => cleaned.extend(c.to_lowercase()),
            _ => cleaned.push(' '),
        }
    }

    let label = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        UNKNOWN_FOOD.to_string()
    } else {
        label
    }
}

/// Drop a trailing `.jpg`-style suffix (a dot followed by 2-4 ASCII
/// alphanumerics, the first a letter).
fn strip_extension(label: &str) -> &str {
    if let Some((stem, ext)) = label.rsplit_once('.') {
        let looks_like_ext = (2..=4).contains(&ext.len())
            && ext.starts_with(|c: char| c.is_ascii_alphabetic())
            && ext.chars().all(|c| c.is_ascii_alphanumeric());
        if looks_like_ext && !stem.trim().is_empty() {
            return stem;
        }
    }
    label
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodHint {
    pub keyword: &'static str,
    pub emoji: &'static str,
    pub weight_grams: f64,
    pub calories: f64,
}

const fn hint(keyword: &'static str, emoji: &'static str, weight_grams: f64, calories: f64) -> FoodHint {
    FoodHint {
        keyword,
        emoji,
        weight_grams,
        calories,
    }
}

// Dishes before ingredients so "chicken salad" resolves to salad.
const FOOD_HINTS: &[FoodHint] = &[
    hint("pizza", "🍕", 300.0, 800.0),
    hint("burger", "🍔", 250.0, 550.0),
    hint("burrito", "🌯", 350.0, 700.0),
    hint("taco", "🌮", 120.0, 210.0),
    hint("sandwich", "🥪", 200.0, 400.0),
    hint("hot dog", "🌭", 100.0, 290.0),
    hint("sushi", "🍣", 200.0, 300.0),
    hint("ramen", "🍜", 500.0, 450.0),
    hint("noodle", "🍜", 300.0, 400.0),
    hint("dumpling", "🥟", 150.0, 250.0),
    hint("curry", "🍛", 350.0, 490.0),
    hint("salad", "🥗", 200.0, 150.0),
    hint("soup", "🍲", 350.0, 200.0),
    hint("pasta", "🍝", 250.0, 350.0),
    hint("spaghetti", "🍝", 250.0, 350.0),
    hint("pancake", "🥞", 150.0, 350.0),
    hint("waffle", "🧇", 75.0, 220.0),
    hint("fries", "🍟", 120.0, 365.0),
    hint("steak", "🥩", 200.0, 500.0),
    hint("chicken", "🍗", 150.0, 250.0),
    hint("salmon", "🐟", 150.0, 310.0),
    hint("fish", "🐟", 150.0, 200.0),
    hint("egg", "🥚", 50.0, 78.0),
    hint("rice", "🍚", 200.0, 260.0),
    hint("oatmeal", "🥣", 250.0, 180.0),
    hint("cereal", "🥣", 40.0, 150.0),
    hint("yogurt", "🥣", 170.0, 100.0),
    hint("toast", "🍞", 40.0, 110.0),
    hint("bread", "🍞", 60.0, 160.0),
    hint("cheese", "🧀", 30.0, 120.0),
    hint("avocado", "🥑", 150.0, 240.0),
    hint("banana", "🍌", 120.0, 105.0),
    hint("apple", "🍎", 180.0, 95.0),
    hint("orange", "🍊", 130.0, 62.0),
    hint("strawberr", "🍓", 150.0, 48.0),
    hint("grape", "🍇", 150.0, 104.0),
    hint("donut", "🍩", 60.0, 250.0),
    hint("cookie", "🍪", 30.0, 150.0),
    hint("cake", "🍰", 100.0, 350.0),
    hint("ice cream", "🍨", 100.0, 210.0),
    hint("chocolate", "🍫", 40.0, 210.0),
    hint("latte", "☕", 350.0, 190.0),
    hint("coffee", "☕", 240.0, 5.0),
    hint("smoothie", "🥤", 350.0, 250.0),
    hint("juice", "🧃", 250.0, 110.0),
    hint("milk", "🥛", 250.0, 150.0),
    hint("beer", "🍺", 355.0, 150.0),
    hint("wine", "🍷", 150.0, 125.0),
];

/// First hint whose keyword occurs in the sanitized `label`.
pub fn lookup_hint(label: &str) -> Option<&'static FoodHint> {
    let label = sanitize_label(label);
    FOOD_HINTS.iter().find(|h| label.contains(h.keyword))
}

/// Static per-label calorie guess used when no other figure exists.
pub fn fallback_calories(label: &str) -> f64 {
    lookup_hint(label)
        .map(|h| h.calories)
        .unwrap_or(DEFAULT_MEAL_CALORIES)
}

pub fn fallback_emoji(label: &str) -> &'static str {
    lookup_hint(label).map(|h| h.emoji).unwrap_or(DEFAULT_EMOJI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_label("  Chicken_Breast "), "chicken breast");
        assert_eq!(sanitize_label("grilled-salmon.jpg"), "grilled salmon");
        assert_eq!(sanitize_label("Mac & Cheese!!"), "mac cheese");
        assert_eq!(sanitize_label("McDonald's Big Mac"), "mcdonalds big mac");
    }

    #[test]
    fn test_sanitize_keeps_decimal_quantities() {
        assert_eq!(sanitize_label("Cola 1.5"), "cola 1 5");
        assert_eq!(sanitize_label("Dr. Pepper"), "dr pepper");
    }

    #[test]
    fn test_sanitize_empty_maps_to_sentinel() {
        assert_eq!(sanitize_label(""), UNKNOWN_FOOD);
        assert_eq!(sanitize_label(" -_- "), UNKNOWN_FOOD);
        assert_eq!(sanitize_label("!!!"), UNKNOWN_FOOD);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in [
            "Chicken_Breast.JPEG",
            "Crème Brûlée",
            "  PAD-THAI  ",
            "",
            "unknown_food",
            "Ben & Jerry's",
            "IMG_2041.heic",
        ] {
            let once = sanitize_label(raw);
            assert_eq!(sanitize_label(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_lookup_prefers_dish_over_ingredient() {
        assert_eq!(lookup_hint("Chicken Caesar Salad").unwrap().keyword, "salad");
        assert_eq!(lookup_hint("fried chicken").unwrap().keyword, "chicken");
        assert!(lookup_hint("quinoa").is_none());
    }

    #[test]
    fn test_fallbacks_use_defaults_for_unknown_labels() {
        assert_eq!(fallback_calories("quinoa"), DEFAULT_MEAL_CALORIES);
        assert_eq!(fallback_emoji("quinoa"), DEFAULT_EMOJI);
        assert_eq!(fallback_calories("pepperoni pizza"), 800.0);
        assert_eq!(fallback_emoji("banana bread"), "🍞");
    }
}
