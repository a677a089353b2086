//! Top-level entry point: fetch, resolve, evaluate, aggregate, compose.
//!
//! The engine owns nothing but a source handle and an immutable config. Every call
//! re-reads the source, so target or profile edits show up on the next call.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use agrimon_core::{AssetId, DomainError, DomainResult, TimeWindow};
use agrimon_monitoring::{ActivityKind, EventDomain, FieldEvent, Reading, Targets};

use crate::AssetRegistry;
use crate::aggregator::{aggregate, latest_field_flags};
use crate::composer::compose;
use crate::evaluator::{check_power, evaluate, missing_readings};
use crate::finding::{Finding, Recommendation};
use crate::indicators::{Indicator, IndicatorSnapshot, progress, roll_up, summary, target_findings};
use crate::resolver::resolve_latest;
use crate::source::{Fetched, RecordSource, SourceError};
use crate::swot::{Swot, swot};

/// Tunables of the engine. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on the global recommendation list; `None` keeps everything.
    pub max_recommendations: Option<usize>,
    /// Cap on each block digest's list.
    pub block_recommendations: usize,
    pub default_window_days: u32,
    pub min_window_days: u32,
    pub max_window_days: u32,
    /// Asset kinds subject to the inspection-staleness check.
    pub inspected_kinds: Vec<ActivityKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recommendations: None,
            block_recommendations: 6,
            default_window_days: 30,
            min_window_days: 1,
            max_window_days: 365,
            inspected_kinds: vec![ActivityKind::Hive, ActivityKind::CultivatedBlock],
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.min_window_days == 0 {
            return Err(DomainError::validation("min_window_days must be at least 1"));
        }
        if self.min_window_days > self.max_window_days {
            return Err(DomainError::validation(format!(
                "empty window range {}..={}",
                self.min_window_days, self.max_window_days
            )));
        }
        if !(self.min_window_days..=self.max_window_days).contains(&self.default_window_days) {
            return Err(DomainError::validation(format!(
                "default_window_days {} outside {}..={}",
                self.default_window_days, self.min_window_days, self.max_window_days
            )));
        }
        Ok(())
    }

    pub fn clamp_window(&self, days: u32) -> u32 {
        days.clamp(self.min_window_days, self.max_window_days.max(self.min_window_days))
    }
}

/// Non-fatal problems met while building a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Stored rows the source could not parse.
    pub skipped_records: usize,
    /// Records pointing at assets the registry does not know.
    pub orphan_records: usize,
    /// Source calls that failed and were replaced by empty input.
    pub source_failures: usize,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-block view: its own recommendations and a SWOT digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDigest {
    pub asset_id: AssetId,
    pub name: String,
    pub recommendations: Vec<Recommendation>,
    pub swot: Swot,
}

/// Result of one `generate_recommendations` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_days: u32,
    /// Never empty.
    pub recommendations: Vec<Recommendation>,
    pub indicators: Vec<Indicator>,
    pub snapshot: IndicatorSnapshot,
    pub blocks: Vec<BlockDigest>,
    pub diagnostics: Diagnostics,
}

pub struct AdvisoryEngine<S> {
    source: S,
    config: EngineConfig,
}

impl<S> AdvisoryEngine<S>
where
    S: RecordSource,
{
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Recommendations over the last `window_days` days, evaluated now.
    pub fn generate_recommendations(&self, window_days: u32) -> AdvisoryReport {
        self.generate_recommendations_at(window_days, Utc::now())
    }

    /// Same as `generate_recommendations`, at a fixed evaluation instant.
    ///
    /// Identical source contents and `now` give identical reports.
    pub fn generate_recommendations_at(&self, window_days: u32, now: DateTime<Utc>) -> AdvisoryReport {
        let started = Instant::now();
        let days = self.config.clamp_window(window_days);
        let window = TimeWindow::trailing_days(now, days);
        let mut diag = Diagnostics::default();

        info!(window_days = days, requested = window_days, "generating recommendations");

        let targets = settle(self.source.get_targets(), "targets", &mut diag);
        let registry: AssetRegistry = settle(self.source.get_assets(), "assets", &mut diag)
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let readings = self.fetch_readings(&registry, &window, &mut diag);
        let events = self.fetch_events(&registry, &window, &mut diag);

        let evaluator_findings = self.evaluate_assets(&registry, &readings, &window);

        let snapshot = roll_up(&registry, &events, &window);
        let mut aggregator_findings = aggregate(
            &registry,
            &events,
            &targets,
            &window,
            &self.config.inspected_kinds,
        );
        aggregator_findings.extend(target_findings(&snapshot, &targets));

        let recommendations = compose(
            &evaluator_findings,
            &aggregator_findings,
            self.config.max_recommendations,
        );
        let blocks = self.block_digests(&registry, &events, &window, &evaluator_findings, &aggregator_findings);
        let indicators = progress(&snapshot, &targets);

        if !diag.is_clean() {
            warn!(
                skipped = diag.skipped_records,
                orphans = diag.orphan_records,
                source_failures = diag.source_failures,
                "report built from partial input"
            );
        }
        info!(
            assets = registry.len(),
            readings = readings.len(),
            events = events.len(),
            recommendations = recommendations.len(),
            totals = %summary(&snapshot),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recommendations generated"
        );

        AdvisoryReport {
            generated_at: now,
            window_start: window.start,
            window_days: days,
            recommendations,
            indicators,
            snapshot,
            blocks,
            diagnostics: diag,
        }
    }

    fn fetch_readings(&self, registry: &AssetRegistry, window: &TimeWindow, diag: &mut Diagnostics) -> Vec<Reading> {
        let fetched = settle(self.source.get_readings(None, window.start), "readings", diag);
        keep_known(fetched, registry, diag)
            .into_iter()
            .filter(|r| window.includes(r.recorded_at))
            .collect()
    }

    /// Reproduction and production are windowed; inspections come with full history.
    fn fetch_events(&self, registry: &AssetRegistry, window: &TimeWindow, diag: &mut Diagnostics) -> Vec<FieldEvent> {
        let mut events = Vec::new();
        for domain in EventDomain::ALL {
            let since = match domain {
                EventDomain::Inspection => None,
                EventDomain::Reproduction | EventDomain::Production => Some(window.start),
            };
            let fetched = settle(self.source.get_events(domain, since), domain.as_str(), diag);
            events.extend(keep_known(fetched, registry, diag).into_iter().filter(|e| e.domain() == domain));
        }
        events
    }

    /// Threshold, then power, then missing-data findings, asset by asset.
    fn evaluate_assets(&self, registry: &AssetRegistry, readings: &[Reading], window: &TimeWindow) -> Vec<Finding> {
        let latest = resolve_latest(readings, window.start);
        let mut findings = Vec::new();

        for asset in registry.values() {
            match latest.get(&asset.id) {
                Some(reading) => {
                    let profile = asset
                        .category
                        .as_deref()
                        .and_then(|c| self.source.get_threshold_profile(c));
                    let before = findings.len();
                    findings.extend(evaluate(asset, reading, profile.as_ref()));
                    findings.extend(check_power(asset, reading));
                    debug!(
                        asset = %asset.id,
                        name = %asset.name,
                        profiled = profile.is_some(),
                        findings = findings.len() - before,
                        "asset evaluated"
                    );
                }
                None if asset.kind == ActivityKind::CultivatedBlock => {
                    findings.push(missing_readings(asset));
                }
                None => {}
            }
        }
        findings
    }

    fn block_digests(
        &self,
        registry: &AssetRegistry,
        events: &[FieldEvent],
        window: &TimeWindow,
        evaluator_findings: &[Finding],
        aggregator_findings: &[Finding],
    ) -> Vec<BlockDigest> {
        let flags = latest_field_flags(registry, events, window);
        let cap = Some(self.config.block_recommendations);

        registry
            .values()
            .filter(|a| a.kind == ActivityKind::CultivatedBlock)
            .map(|asset| {
                let own = |fs: &[Finding]| -> Vec<Finding> {
                    fs.iter().filter(|f| f.asset_id == Some(asset.id)).cloned().collect()
                };
                let recommendations = compose(&own(evaluator_findings), &own(aggregator_findings), cap);
                let swot = swot(&recommendations, flags.get(&asset.id).copied().unwrap_or_default());
                BlockDigest {
                    asset_id: asset.id,
                    name: asset.name.clone(),
                    recommendations,
                    swot,
                }
            })
            .collect()
    }
}

/// Resolve a source result to a value, recording failures.
fn settle<T: Default>(result: Result<T, SourceError>, what: &str, diag: &mut Diagnostics) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(source = what, error = %err, "record source failed; continuing with empty input");
            diag.source_failures += 1;
            T::default()
        }
    }
}

/// Drop records of unknown assets, counting them and the source's own skips.
fn keep_known<R>(fetched: Fetched<R>, registry: &AssetRegistry, diag: &mut Diagnostics) -> Vec<R>
where
    R: agrimon_core::AssetRecord,
{
    diag.skipped_records += fetched.skipped;
    let total = fetched.records.len();
    let kept: Vec<R> = fetched
        .records
        .into_iter()
        .filter(|r| registry.contains_key(&r.asset_id()))
        .collect();
    let orphans = total - kept.len();
    if orphans > 0 {
        debug!(orphans, "ignoring records of unknown assets");
        diag.orphan_records += orphans;
    }
    kept
}
