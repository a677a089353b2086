//! Configuration loading and representation.
//!
//! Search order: `$AGRIMON_CONFIG`, then `./agrimon.json`, then built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use agrimon_advisory::EngineConfig;
use agrimon_core::DomainError;
use agrimon_monitoring::{ProfileSet, Targets, ThresholdProfile};
use agrimon_observability::ObservabilityConfig;

use crate::store::InMemoryRecordStore;

pub const CONFIG_ENV: &str = "AGRIMON_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "agrimon.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<DomainError> for ConfigError {
    fn from(err: DomainError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Deployment configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgrimonConfig {
    pub engine: EngineConfig,
    /// Crop profiles; absent means the built-in table.
    pub profiles: Option<Vec<ThresholdProfile>>,
    /// Initial operator targets.
    pub targets: Targets,
    pub log: ObservabilityConfig,
}

impl AgrimonConfig {
    /// Load using the standard search order. Never fails: a broken file is logged
    /// and replaced by defaults.
    pub fn load() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
    }

    fn resolve(explicit: Option<&Path>, fallback: &Path) -> Self {
        let candidate = match explicit {
            Some(path) => path,
            None if fallback.exists() => fallback,
            None => return Self::default(),
        };
        match Self::load_from_file(candidate) {
            Ok(config) => {
                info!(path = %candidate.display(), "configuration loaded");
                config
            }
            Err(err) => {
                warn!(error = %err, "configuration ignored, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.targets.validate()?;
        self.profile_set()?;
        Ok(())
    }

    /// Configured profiles, or the built-in table when none are configured.
    pub fn profile_set(&self) -> Result<ProfileSet, ConfigError> {
        match &self.profiles {
            None => Ok(ProfileSet::builtin()),
            Some(list) => Ok(ProfileSet::from_profiles(list.iter().cloned())?),
        }
    }

    /// An empty in-memory store seeded with this configuration's profiles and targets.
    pub fn build_store(&self) -> Result<InMemoryRecordStore, ConfigError> {
        let store = InMemoryRecordStore::with_profiles(self.profile_set()?);
        store
            .set_targets(self.targets.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(store)
    }
}
