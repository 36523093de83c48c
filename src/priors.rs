//! Food-priors store
//!
//! Read-only reference values per 100 g, keyed by lower-cased food label.
//! The analyzer only depends on the [`PriorsStore`] query contract; the
//! in-memory store covers the bundled table and JSON files.

use crate::models::Gaussian;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_PRIORS: &str = include_str!("../data/food_priors.json");

/// Reference nutrition for 100 g of one food.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodPrior {
    pub label: String,
    pub kcal: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: Option<f64>,
    /// Mass density in g/mL.
    #[serde(default)]
    pub density: Option<Gaussian>,
    /// Energy density in kcal/g; derived from `kcal` when absent.
    #[serde(default)]
    pub kcal_per_g: Option<Gaussian>,
}

impl FoodPrior {
    pub fn energy_density_mu(&self) -> f64 {
        self.kcal_per_g
            .map(|g| g.mu)
            .unwrap_or(self.kcal / 100.0)
    }
}

#[async_trait]
pub trait PriorsStore: Send + Sync {
    /// Case-insensitive exact lookup of `label`.
    async fn lookup(&self, label: &str) -> Result<Option<FoodPrior>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPriorsStore {
    entries: HashMap<String, FoodPrior>,
}

fn normalize_key(label: &str) -> String {
    label.trim().to_lowercase()
}

impl InMemoryPriorsStore {
    pub fn new(priors: Vec<FoodPrior>) -> Self {
        let entries = priors
            .into_iter()
            .map(|prior| (normalize_key(&prior.label), prior))
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The table bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_PRIORS)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let store = Self::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(
            "Loaded {} food priors from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    fn from_json(json: &str) -> Result<Self> {
        let priors: Vec<FoodPrior> = serde_json::from_str(json)?;
        if let Some(bad) = priors
            .iter()
            .find(|p| p.label.trim().is_empty() || p.kcal < 0.0)
        {
            return Err(Error::PriorsStore(format!(
                "Invalid prior entry '{}'",
                bad.label
            )));
        }
        Ok(Self::new(priors))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PriorsStore for InMemoryPriorsStore {
    async fn lookup(&self, label: &str) -> Result<Option<FoodPrior>> {
        Ok(self.entries.get(&normalize_key(label)).cloned())
    }
}
