//! Data models and structures
//!
//! Defines the request/response contract of the analyzer, the classifier
//! verdict shared by the evidence paths, and runtime configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Atwater energy factors in kcal per gram.
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Whole-pipeline backends, in the order the fallback chain prefers them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Managed,
    Vision,
    Stub,
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendId::Managed => "managed",
            BackendId::Vision => "vision",
            BackendId::Stub => "stub",
        };
        write!(f, "{}", s)
    }
}

/// Evidence regime an image falls into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Packaged,
    Restaurant,
    Prepared,
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageType::Packaged => "packaged",
            ImageType::Restaurant => "restaurant",
            ImageType::Prepared => "prepared",
        };
        write!(f, "{}", s)
    }
}

/// Classifier verdict for one image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageTypeResult {
    pub image_type: ImageType,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
}

/// Estimation strategy that produced an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvidencePath {
    Label,
    Menu,
    Geometry,
}

impl EvidencePath {
    /// Calorie standard deviation as a fraction of the calorie estimate.
    pub fn sigma_fraction(self) -> f64 {
        match self {
            EvidencePath::Label => 0.05,
            EvidencePath::Menu => 0.10,
            EvidencePath::Geometry => 0.15,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            EvidencePath::Label => "path:label",
            EvidencePath::Menu => "path:menu",
            EvidencePath::Geometry => "path:geometry",
        }
    }
}

/// One analysis request. Exactly one image reference must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl AnalyzeInput {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            image_base64: Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            ..Self::default()
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }
}

/// Macronutrient grams for the full portion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Macros {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
}

impl Macros {
    /// Whole-kcal energy implied by the macros via Atwater factors.
    pub fn calories(&self) -> f64 {
        (self.protein_g * KCAL_PER_G_PROTEIN
            + self.carbs_g * KCAL_PER_G_CARBS
            + self.fat_g * KCAL_PER_G_FAT)
            .round()
    }

    /// All fields finite and non-negative.
    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        ok(self.protein_g) && ok(self.carbs_g) && ok(self.fat_g) && self.fiber_g.map_or(true, ok)
    }

    pub fn rounded(&self) -> Self {
        Self {
            protein_g: round1(self.protein_g),
            carbs_g: round1(self.carbs_g),
            fat_g: round1(self.fat_g),
            fiber_g: self.fiber_g.map(round1),
        }
    }
}

/// Mean and standard deviation of an uncertain quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Gaussian {
    pub mu: f64,
    pub sigma: f64,
}

impl Gaussian {
    pub fn with_relative_sigma(mu: f64, fraction: f64) -> Self {
        Self {
            mu,
            sigma: mu * fraction,
        }
    }
}

/// Geometry-path priors for downstream combination with an independent
/// volume measurement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeometryPriors {
    #[serde(rename = "kcalPerG")]
    pub kcal_per_g: Gaussian,
    pub density: Gaussian,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NutritionLabel {
    pub serving_size: String,
    pub calories_per_serving: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_servings: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub restaurant: String,
    pub item_name: String,
    pub calories: f64,
}

/// One candidate food identification in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeItem {
    pub label: String,
    pub confidence: f64,
    pub calories: f64,
    pub sigma_calories: f64,
    pub weight_grams: f64,
    pub sigma_weight_grams: f64,
    #[serde(rename = "volumeML")]
    pub volume_ml: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priors: Option<GeometryPriors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macros: Option<Macros>,
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_label: Option<NutritionLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_item: Option<MenuItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<EvidencePath>,
    pub analyzer_source: BackendId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<ImageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub used: Vec<BackendId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeOutput {
    pub items: Vec<AnalyzeItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inference_api_key: Option<String>,
    pub inference_endpoint: String,
    pub inference_model: String,
    pub managed_api_key: Option<String>,
    pub managed_endpoint: String,
    pub managed_model: String,
    pub default_portion_grams: f64,
    pub default_weight_sigma: f64,
    pub backend_timeout: Duration,
    pub request_timeout: Duration,
    pub priors_path: Option<PathBuf>,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inference_api_key: None,
            inference_endpoint: "https://api.openai.com".to_string(),
            inference_model: "gpt-4o-mini".to_string(),
            managed_api_key: None,
            managed_endpoint: "https://generativelanguage.googleapis.com".to_string(),
            managed_model: "gemini-2.5-flash".to_string(),
            default_portion_grams: 250.0,
            default_weight_sigma: 0.25,
            backend_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(30),
            priors_path: None,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let config = Self {
            inference_api_key: get("INFERENCE_API_KEY"),
            inference_endpoint: get("INFERENCE_ENDPOINT").unwrap_or(defaults.inference_endpoint),
            inference_model: get("INFERENCE_MODEL").unwrap_or(defaults.inference_model),
            managed_api_key: get("MANAGED_API_KEY"),
            managed_endpoint: get("MANAGED_ENDPOINT").unwrap_or(defaults.managed_endpoint),
            managed_model: get("MANAGED_MODEL").unwrap_or(defaults.managed_model),
            default_portion_grams: parse_or(
                get("DEFAULT_PORTION_GRAMS"),
                "DEFAULT_PORTION_GRAMS",
                defaults.default_portion_grams,
            )?,
            default_weight_sigma: parse_or(
                get("DEFAULT_WEIGHT_SIGMA"),
                "DEFAULT_WEIGHT_SIGMA",
                defaults.default_weight_sigma,
            )?,
            backend_timeout: Duration::from_secs(parse_or(
                get("BACKEND_TIMEOUT_SECS"),
                "BACKEND_TIMEOUT_SECS",
                defaults.backend_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            priors_path: get("PRIORS_PATH").map(PathBuf::from),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
        };

        if !(config.default_portion_grams > 0.0) {
            return Err(crate::Error::Config(
                "DEFAULT_PORTION_GRAMS must be positive".to_string(),
            ));
        }
        if !(config.default_weight_sigma >= 0.0) {
            return Err(crate::Error::Config(
                "DEFAULT_WEIGHT_SIGMA must not be negative".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> crate::Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| crate::Error::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
