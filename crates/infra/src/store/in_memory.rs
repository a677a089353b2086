use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use agrimon_advisory::{Fetched, RecordSource, SourceError};
use agrimon_core::AssetId;
use agrimon_monitoring::ingest::{ingest_events, ingest_readings};
use agrimon_monitoring::{
    EventDomain, FieldEvent, IngestReport, MonitoredAsset, ProfileSet, RawEvent, RawReading, Reading, Targets,
    ThresholdProfile,
};

use super::StoreError;

#[derive(Debug, Default)]
struct Tables {
    assets: BTreeMap<AssetId, MonitoredAsset>,
    readings: Vec<Reading>,
    events: Vec<FieldEvent>,
    /// Last assigned sequence, shared by readings and events.
    last_sequence: u64,
    skipped_readings: usize,
    skipped_events: BTreeMap<EventDomain, usize>,
}

impl Tables {
    fn next_sequence(&mut self) -> u64 {
        self.last_sequence += 1;
        self.last_sequence
    }
}

/// In-memory monitoring store.
///
/// Append-only for readings and events; the store assigns each appended record a
/// monotonically increasing `sequence`. Intended for tests/dev and as the
/// reference `RecordSource`.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
    profiles: RwLock<ProfileSet>,
    targets: RwLock<Targets>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::with_profiles(ProfileSet::builtin())
    }
}

impl InMemoryRecordStore {
    /// Empty store with the built-in crop profiles and no targets.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: ProfileSet) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            profiles: RwLock::new(profiles),
            targets: RwLock::new(Targets::default()),
        }
    }

    pub fn register_asset(&self, asset: MonitoredAsset) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.assets.contains_key(&asset.id) {
            return Err(StoreError::DuplicateAsset(asset.id));
        }
        debug!(asset = %asset.id, kind = %asset.kind, "asset registered");
        tables.assets.insert(asset.id, asset);
        Ok(())
    }

    /// Append a reading; returns the sequence it was stored under.
    pub fn append_reading(&self, mut reading: Reading) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        reading.sequence = tables.next_sequence();
        let seq = reading.sequence;
        tables.readings.push(reading);
        Ok(seq)
    }

    /// Append a field event; returns the sequence it was stored under.
    pub fn append_event(&self, mut event: FieldEvent) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        event.sequence = tables.next_sequence();
        let seq = event.sequence;
        tables.events.push(event);
        Ok(seq)
    }

    /// Parse stored reading rows and append the valid ones in row-id order.
    ///
    /// Dropped rows are remembered and reported by `get_readings`.
    pub fn ingest_raw_readings(&self, rows: Vec<RawReading>) -> Result<IngestReport, StoreError> {
        let mut parsed = ingest_readings(rows);
        parsed.records.sort_by_key(|r| r.sequence);

        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        for mut reading in parsed.records {
            reading.sequence = tables.next_sequence();
            tables.readings.push(reading);
        }
        tables.skipped_readings += parsed.report.skipped;
        log_report("readings", &parsed.report);
        Ok(parsed.report)
    }

    /// Parse stored event rows and append the valid ones in row-id order.
    ///
    /// Dropped rows whose domain label is recognized are reported by `get_events`
    /// for that domain; rows with an unknown label only show up in the returned
    /// report.
    pub fn ingest_raw_events(&self, rows: Vec<RawEvent>) -> Result<IngestReport, StoreError> {
        let labels: Vec<Option<EventDomain>> = rows.iter().map(|r| EventDomain::from_label(&r.domain)).collect();
        let mut parsed = ingest_events(rows);
        parsed.records.sort_by_key(|e| e.sequence);

        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        for mut event in parsed.records {
            event.sequence = tables.next_sequence();
            tables.events.push(event);
        }
        for issue in parsed.report.issues.iter().filter(|i| i.dropped) {
            if let Some(Some(domain)) = labels.get(issue.index) {
                *tables.skipped_events.entry(*domain).or_default() += 1;
            }
        }
        log_report("events", &parsed.report);
        Ok(parsed.report)
    }

    /// Replace the operator targets. Visible to the next engine call.
    pub fn set_targets(&self, targets: Targets) -> Result<(), StoreError> {
        targets.validate()?;
        let mut current = self.targets.write().map_err(|_| StoreError::LockPoisoned)?;
        *current = targets;
        Ok(())
    }

    /// Add or replace one crop profile.
    pub fn upsert_profile(&self, profile: ThresholdProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(|_| StoreError::LockPoisoned)?;
        profiles.insert(profile)?;
        Ok(())
    }

    pub fn set_profiles(&self, set: ProfileSet) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(|_| StoreError::LockPoisoned)?;
        *profiles = set;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .map(|t| t.readings.len() + t.events.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn log_report(table: &str, report: &IngestReport) {
    if report.skipped > 0 {
        warn!(table, accepted = report.accepted, skipped = report.skipped, "stored rows dropped during ingestion");
    } else {
        debug!(table, accepted = report.accepted, "rows ingested");
    }
    for issue in report.issues.iter().filter(|i| !i.dropped) {
        debug!(table, index = issue.index, reason = %issue.reason, "field ignored");
    }
}

fn poisoned(what: &str) -> SourceError {
    SourceError::LockPoisoned(format!("{what} table"))
}

impl RecordSource for InMemoryRecordStore {
    fn get_assets(&self) -> Result<Vec<MonitoredAsset>, SourceError> {
        let tables = self.tables.read().map_err(|_| poisoned("assets"))?;
        Ok(tables.assets.values().cloned().collect())
    }

    fn get_readings(&self, asset: Option<AssetId>, since: DateTime<Utc>) -> Result<Fetched<Reading>, SourceError> {
        let tables = self.tables.read().map_err(|_| poisoned("readings"))?;
        let records = tables
            .readings
            .iter()
            .filter(|r| r.recorded_at >= since)
            .filter(|r| asset.is_none_or(|a| a == r.asset_id))
            .cloned()
            .collect();
        Ok(Fetched::new(records, tables.skipped_readings))
    }

    fn get_events(&self, domain: EventDomain, since: Option<DateTime<Utc>>) -> Result<Fetched<FieldEvent>, SourceError> {
        let tables = self.tables.read().map_err(|_| poisoned("events"))?;
        let records = tables
            .events
            .iter()
            .filter(|e| e.domain() == domain)
            .filter(|e| since.is_none_or(|s| e.recorded_at >= s))
            .cloned()
            .collect();
        let skipped = tables.skipped_events.get(&domain).copied().unwrap_or(0);
        Ok(Fetched::new(records, skipped))
    }

    fn get_threshold_profile(&self, category: &str) -> Option<ThresholdProfile> {
        match self.profiles.read() {
            Ok(profiles) => profiles.get(category).cloned(),
            Err(_) => {
                warn!(category, "profiles table lock poisoned, evaluating without a profile");
                None
            }
        }
    }

    fn get_targets(&self) -> Result<Targets, SourceError> {
        self.targets
            .read()
            .map(|t| t.clone())
            .map_err(|_| poisoned("targets"))
    }
}
