//! Read-only boundary to the monitoring store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use agrimon_core::AssetId;
use agrimon_monitoring::{EventDomain, FieldEvent, MonitoredAsset, Reading, Targets, ThresholdProfile};

/// Records returned by a source, plus how many stored rows it could not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub records: Vec<T>,
    /// Rows dropped by the source (malformed timestamp, bad asset id, ...).
    pub skipped: usize,
}

impl<T> Fetched<T> {
    pub fn new(records: Vec<T>, skipped: usize) -> Self {
        Self { records, skipped }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for Fetched<T> {
    fn from(records: Vec<T>) -> Self {
        Self::new(records, 0)
    }
}

/// Record source operation error.
///
/// These are infrastructure errors. The engine never propagates them: a failed
/// fetch becomes an empty input and a diagnostic.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("record source unavailable: {0}")]
    Unavailable(String),

    #[error("record source lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Everything the advisory engine reads.
///
/// ## Contract
///
/// - Read-only: the engine never writes back.
/// - `get_readings` returns every reading at or after `since`, optionally
///   restricted to one asset. Order is irrelevant; the engine resolves latest state.
/// - `get_events(domain, None)` returns the full history. Staleness checks need it.
/// - `get_threshold_profile` looks categories up case-insensitively; `None` means
///   no opinion for that category.
/// - `get_targets` returns the current value on every call, so edits made between
///   two calls are visible on the next one.
pub trait RecordSource: Send + Sync {
    fn get_assets(&self) -> Result<Vec<MonitoredAsset>, SourceError>;

    fn get_readings(&self, asset: Option<AssetId>, since: DateTime<Utc>) -> Result<Fetched<Reading>, SourceError>;

    fn get_events(&self, domain: EventDomain, since: Option<DateTime<Utc>>) -> Result<Fetched<FieldEvent>, SourceError>;

    fn get_threshold_profile(&self, category: &str) -> Option<ThresholdProfile>;

    fn get_targets(&self) -> Result<Targets, SourceError>;
}

impl<S> RecordSource for Arc<S>
where
    S: RecordSource + ?Sized,
{
    fn get_assets(&self) -> Result<Vec<MonitoredAsset>, SourceError> {
        (**self).get_assets()
    }

    fn get_readings(&self, asset: Option<AssetId>, since: DateTime<Utc>) -> Result<Fetched<Reading>, SourceError> {
        (**self).get_readings(asset, since)
    }

    fn get_events(&self, domain: EventDomain, since: Option<DateTime<Utc>>) -> Result<Fetched<FieldEvent>, SourceError> {
        (**self).get_events(domain, since)
    }

    fn get_threshold_profile(&self, category: &str) -> Option<ThresholdProfile> {
        (**self).get_threshold_profile(category)
    }

    fn get_targets(&self) -> Result<Targets, SourceError> {
        (**self).get_targets()
    }
}
