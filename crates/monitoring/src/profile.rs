use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agrimon_core::{DomainError, DomainResult};

use crate::reading::Metric;

/// Acceptable closed interval `[low, high]` for a metric.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub fn new(low: f64, high: f64) -> DomainResult<Self> {
        let b = Self { low, high };
        b.validate()?;
        Ok(b)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !(self.low.is_finite() && self.high.is_finite()) {
            return Err(DomainError::validation("bounds must be finite"));
        }
        if self.low > self.high {
            return Err(DomainError::validation(format!(
                "low bound {} is above high bound {}",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Per-category table of acceptable metric ranges.
///
/// A metric without a bound means "no opinion".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    pub category: String,
    #[serde(default)]
    pub bounds: BTreeMap<Metric, Bounds>,
}

impl ThresholdProfile {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into().trim().to_string(),
            bounds: BTreeMap::new(),
        }
    }

    pub fn with_bound(mut self, metric: Metric, low: f64, high: f64) -> DomainResult<Self> {
        if metric.is_soft_alert() {
            return Err(DomainError::validation(format!(
                "{metric} follows the fixed low-power rule and cannot be profiled"
            )));
        }
        self.bounds.insert(metric, Bounds::new(low, high)?);
        Ok(self)
    }

    pub fn bound(&self, metric: Metric) -> Option<Bounds> {
        self.bounds.get(&metric).copied()
    }

    pub fn key(&self) -> String {
        normalize_category(&self.category)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.key().is_empty() {
            return Err(DomainError::validation("profile category cannot be empty"));
        }
        for (metric, bounds) in &self.bounds {
            if metric.is_soft_alert() {
                return Err(DomainError::validation(format!(
                    "profile '{}': {metric} cannot be profiled",
                    self.category
                )));
            }
            bounds
                .validate()
                .map_err(|e| DomainError::validation(format!("profile '{}', {metric}: {e}", self.category)))?;
        }
        Ok(())
    }
}

/// Case- and whitespace-insensitive category key.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Collection of threshold profiles, looked up by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSet {
    profiles: BTreeMap<String, ThresholdProfile>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list; later entries replace earlier ones with the same category.
    pub fn from_profiles(profiles: impl IntoIterator<Item = ThresholdProfile>) -> DomainResult<Self> {
        let mut set = Self::new();
        for p in profiles {
            set.insert(p)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, profile: ThresholdProfile) -> DomainResult<()> {
        profile.validate()?;
        self.profiles.insert(profile.key(), profile);
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<&ThresholdProfile> {
        self.profiles.get(&normalize_category(category))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThresholdProfile> {
        self.profiles.values()
    }

    /// Agronomic defaults for the crops grown on site.
    pub fn builtin() -> Self {
        let table: [(&str, [(Metric, f64, f64); 7]); 3] = [
            (
                "Banane",
                [
                    (Metric::SoilPh, 5.5, 7.0),
                    (Metric::SoilMoisture, 60.0, 85.0),
                    (Metric::SoilTemp, 22.0, 32.0),
                    (Metric::AirTemp, 20.0, 35.0),
                    (Metric::AirHumidity, 55.0, 95.0),
                    (Metric::Fertility, 800.0, 2000.0),
                    (Metric::Light, 8000.0, 120_000.0),
                ],
            ),
            (
                "Taro",
                [
                    (Metric::SoilPh, 5.5, 6.8),
                    (Metric::SoilMoisture, 70.0, 95.0),
                    (Metric::SoilTemp, 20.0, 32.0),
                    (Metric::AirTemp, 18.0, 35.0),
                    (Metric::AirHumidity, 60.0, 98.0),
                    (Metric::Fertility, 500.0, 1800.0),
                    (Metric::Light, 5000.0, 100_000.0),
                ],
            ),
            (
                "PIF (plants issues de fragments)",
                [
                    (Metric::SoilPh, 5.5, 7.0),
                    (Metric::SoilMoisture, 55.0, 80.0),
                    (Metric::SoilTemp, 20.0, 32.0),
                    (Metric::AirTemp, 20.0, 35.0),
                    (Metric::AirHumidity, 60.0, 95.0),
                    (Metric::Fertility, 600.0, 1800.0),
                    (Metric::Light, 3000.0, 80_000.0),
                ],
            ),
        ];

        let mut profiles = BTreeMap::new();
        for (category, rows) in table {
            let mut profile = ThresholdProfile::new(category);
            for (metric, low, high) in rows {
                profile.bounds.insert(metric, Bounds { low, high });
            }
            profiles.insert(profile.key(), profile);
        }
        Self { profiles }
    }
}
