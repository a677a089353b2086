//! Parse step between stored rows and typed records.
//!
//! Stored rows are loosely typed: ISO timestamps as text, numeric columns that may
//! hold numbers, numeric strings or nulls. This module turns them into `Reading`
//! and `FieldEvent` values. A row whose timestamp or asset id cannot be parsed is
//! dropped and reported; a field that cannot be parsed becomes absent and is
//! reported, but the row is kept.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use agrimon_core::{AssetId, DomainError, DomainResult};

use crate::event::{
    ColonyStrength, EventDetail, EventDomain, FieldEvent, InspectionLog, ProductionLog,
    ReproductionLog,
};
use crate::reading::{Metric, Reading};

/// Reading row as stored (one column per metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default, alias = "reading_id")]
    pub id: Option<u64>,
    pub asset_id: String,
    #[serde(alias = "recorded_at")]
    pub date: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, JsonValue>,
}

/// Event row as stored; `domain` selects how `fields` are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, alias = "log_id", alias = "insp_id", alias = "obs_id")]
    pub id: Option<u64>,
    pub asset_id: String,
    #[serde(alias = "recorded_at")]
    pub date: String,
    pub domain: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, JsonValue>,
}

/// One problem met while parsing a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestIssue {
    /// Position of the row in the input.
    pub index: usize,
    pub record_id: Option<u64>,
    /// `true` when the whole row was dropped.
    pub dropped: bool,
    pub reason: String,
}

/// Non-fatal diagnostics of an ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: usize,
    pub issues: Vec<IngestIssue>,
}

impl IngestReport {
    fn drop_row(&mut self, index: usize, record_id: Option<u64>, err: DomainError) {
        self.skipped += 1;
        self.issues.push(IngestIssue {
            index,
            record_id,
            dropped: true,
            reason: err.to_string(),
        });
    }

    fn field_issue(&mut self, index: usize, record_id: Option<u64>, reason: String) {
        self.issues.push(IngestIssue {
            index,
            record_id,
            dropped: false,
            reason,
        });
    }
}

/// Parsed records plus the diagnostics of the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub report: IngestReport,
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the naive ISO-8601 layouts written by the input forms
/// (`2025-01-31T08:30:00.123456`, `2025-01-31 08:30:00`, `2025-01-31`). Naive
/// values are read as UTC.
pub fn parse_timestamp(raw: &str) -> DomainResult<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    const NAIVE: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = d.and_hms_opt(0, 0, 0) {
            return Ok(ndt.and_utc());
        }
    }
    Err(DomainError::invalid_timestamp(format!("unrecognized timestamp '{s}'")))
}

fn sequence_for(id: Option<u64>, index: usize) -> u64 {
    id.unwrap_or(index as u64 + 1)
}

/// Numeric value of a loosely-typed field. `Ok(None)` means null/absent.
fn number(value: &JsonValue) -> Result<Option<f64>, String> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(format!("non-finite number {n}")),
        },
        JsonValue::String(s) if s.trim().is_empty() => Ok(None),
        JsonValue::String(s) => match s.trim().replace(',', ".").parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(format!("'{s}' is not a number")),
        },
        other => Err(format!("unexpected value {other}")),
    }
}

fn count(value: &JsonValue) -> Result<Option<u32>, String> {
    match number(value)? {
        None => Ok(None),
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => Ok(Some(v as u32)),
        Some(v) => Err(format!("{v} is not a non-negative whole count")),
    }
}

fn flag(value: &JsonValue) -> Result<Option<bool>, String> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(b) => Ok(Some(*b)),
        JsonValue::Number(n) => Ok(n.as_f64().map(|v| v != 0.0)),
        JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "oui" => Ok(Some(true)),
            "0" | "false" | "no" | "non" => Ok(Some(false)),
            other => Err(format!("'{other}' is not a flag")),
        },
        other => Err(format!("unexpected value {other}")),
    }
}

/// Field reader that records per-field problems instead of failing the row.
struct Fields<'a> {
    fields: &'a BTreeMap<String, JsonValue>,
    index: usize,
    record_id: Option<u64>,
    report: &'a mut IngestReport,
}

impl Fields<'_> {
    fn read<T>(&mut self, key: &str, parse: fn(&JsonValue) -> Result<Option<T>, String>) -> Option<T> {
        let value = self.fields.get(key)?;
        match parse(value) {
            Ok(v) => v,
            Err(reason) => {
                self.report
                    .field_issue(self.index, self.record_id, format!("{key}: {reason}"));
                None
            }
        }
    }

    fn number(&mut self, key: &str) -> Option<f64> {
        self.read(key, number)
    }

    fn count(&mut self, key: &str) -> Option<u32> {
        self.read(key, count)
    }

    fn flag(&mut self, key: &str) -> Option<bool> {
        self.read(key, flag)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(JsonValue::as_str).map(str::trim)
    }
}

pub fn ingest_readings(rows: impl IntoIterator<Item = RawReading>) -> Ingested<Reading> {
    let mut report = IngestReport::default();
    let mut records = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        let head = row
            .asset_id
            .parse::<AssetId>()
            .and_then(|asset_id| parse_timestamp(&row.date).map(|at| (asset_id, at)));
        let (asset_id, recorded_at) = match head {
            Ok(h) => h,
            Err(e) => {
                report.drop_row(index, row.id, e);
                continue;
            }
        };

        let mut reading = Reading::new(asset_id, recorded_at).with_sequence(sequence_for(row.id, index));
        let mut fields = Fields {
            fields: &row.fields,
            index,
            record_id: row.id,
            report: &mut report,
        };
        for metric in Metric::ALL {
            reading.set(metric, fields.number(metric.key()));
        }
        records.push(reading);
    }

    report.accepted = records.len();
    Ingested { records, report }
}

fn colony_strength(raw: &str) -> Option<ColonyStrength> {
    match raw.to_lowercase().as_str() {
        "weak" | "faible" => Some(ColonyStrength::Weak),
        "medium" | "moyenne" => Some(ColonyStrength::Medium),
        "strong" | "forte" => Some(ColonyStrength::Strong),
        _ => None,
    }
}

fn detail_for(label: &str, f: &mut Fields<'_>) -> DomainResult<EventDetail> {
    let Some(domain) = EventDomain::from_label(label) else {
        return Err(DomainError::validation(format!(
            "unknown event domain '{}'",
            label.trim()
        )));
    };
    let detail = match domain {
        EventDomain::Reproduction => EventDetail::Reproduction(ReproductionLog {
            females: f.count("females"),
            males: f.count("males"),
            births: f.count("births").unwrap_or(0),
            deaths: f.count("deaths").unwrap_or(0),
            feed_kg: f.number("feed_kg"),
        }),
        EventDomain::Production => EventDetail::Production(ProductionLog {
            produced: f.count("produced").unwrap_or(0),
            transplanted: f.count("transplanted").unwrap_or(0),
            losses: f.count("losses").unwrap_or(0),
            reprise_rate_pct: f.number("reprise_rate_pct"),
        }),
        EventDomain::Inspection => {
            let colony = f.text("colony_strength").and_then(colony_strength);
            EventDetail::Inspection(InspectionLog {
                pests: f.flag("pests").unwrap_or(false),
                disease: f.flag("disease").unwrap_or(false),
                honey_kg: f.number("honey_kg"),
                queen_seen: f.flag("queen_seen"),
                colony_strength: colony,
            })
        }
    };
    Ok(detail)
}

pub fn ingest_events(rows: impl IntoIterator<Item = RawEvent>) -> Ingested<FieldEvent> {
    let mut report = IngestReport::default();
    let mut records = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        let head = row
            .asset_id
            .parse::<AssetId>()
            .and_then(|asset_id| parse_timestamp(&row.date).map(|at| (asset_id, at)));
        let (asset_id, recorded_at) = match head {
            Ok(h) => h,
            Err(e) => {
                report.drop_row(index, row.id, e);
                continue;
            }
        };

        let mut fields = Fields {
            fields: &row.fields,
            index,
            record_id: row.id,
            report: &mut report,
        };
        let detail = match detail_for(&row.domain, &mut fields) {
            Ok(d) => d,
            Err(e) => {
                report.drop_row(index, row.id, e);
                continue;
            }
        };

        let mut event = FieldEvent::new(asset_id, recorded_at, detail)
            .with_sequence(sequence_for(row.id, index));
        if let Some(notes) = row.notes {
            event = event.with_notes(notes);
        }
        records.push(event);
    }

    report.accepted = records.len();
    Ingested { records, report }
}
