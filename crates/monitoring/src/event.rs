use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrimon_core::{AssetId, AssetRecord};

/// Domain of a field event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDomain {
    /// Births/deaths (rabbit units).
    Reproduction,
    /// Produced/lost flows (nursery lots).
    Production,
    /// Hive inspections and block field observations.
    Inspection,
}

impl EventDomain {
    pub const ALL: [EventDomain; 3] = [
        EventDomain::Reproduction,
        EventDomain::Production,
        EventDomain::Inspection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventDomain::Reproduction => "reproduction",
            EventDomain::Production => "production",
            EventDomain::Inspection => "inspection",
        }
    }

    /// Domain of a stored log label, accepting the legacy table names.
    pub fn from_label(label: &str) -> Option<EventDomain> {
        match label.trim().to_lowercase().as_str() {
            "reproduction" | "rabbit_log" => Some(EventDomain::Reproduction),
            "production" | "vivoplant_log" => Some(EventDomain::Production),
            "inspection" | "hive_inspection" | "field_observation" => Some(EventDomain::Inspection),
            _ => None,
        }
    }
}

/// Log entry for a rabbit unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReproductionLog {
    pub females: Option<u32>,
    pub males: Option<u32>,
    pub births: u32,
    pub deaths: u32,
    pub feed_kg: Option<f64>,
}

/// Log entry for a nursery lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionLog {
    pub produced: u32,
    pub transplanted: u32,
    pub losses: u32,
    /// Explicit success ("reprise") rate reported by the operator, in percent.
    pub reprise_rate_pct: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColonyStrength {
    Weak,
    Medium,
    Strong,
}

/// Hive inspection or block field observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionLog {
    pub pests: bool,
    pub disease: bool,
    pub honey_kg: Option<f64>,
    pub queen_seen: Option<bool>,
    pub colony_strength: Option<ColonyStrength>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum EventDetail {
    Reproduction(ReproductionLog),
    Production(ProductionLog),
    Inspection(InspectionLog),
}

impl EventDetail {
    pub fn domain(&self) -> EventDomain {
        match self {
            EventDetail::Reproduction(_) => EventDomain::Reproduction,
            EventDetail::Production(_) => EventDomain::Production,
            EventDetail::Inspection(_) => EventDomain::Inspection,
        }
    }
}

/// A timestamped, domain-specific occurrence for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEvent {
    pub asset_id: AssetId,
    pub recorded_at: DateTime<Utc>,
    /// Store-assigned insertion order.
    #[serde(default)]
    pub sequence: u64,
    pub notes: Option<String>,
    pub detail: EventDetail,
}

impl FieldEvent {
    pub fn new(asset_id: AssetId, recorded_at: DateTime<Utc>, detail: EventDetail) -> Self {
        Self {
            asset_id,
            recorded_at,
            sequence: 0,
            notes: None,
            detail,
        }
    }

    pub fn reproduction(asset_id: AssetId, recorded_at: DateTime<Utc>, births: u32, deaths: u32) -> Self {
        Self::new(
            asset_id,
            recorded_at,
            EventDetail::Reproduction(ReproductionLog {
                births,
                deaths,
                ..ReproductionLog::default()
            }),
        )
    }

    pub fn production(asset_id: AssetId, recorded_at: DateTime<Utc>, produced: u32, losses: u32) -> Self {
        Self::new(
            asset_id,
            recorded_at,
            EventDetail::Production(ProductionLog {
                produced,
                losses,
                ..ProductionLog::default()
            }),
        )
    }

    pub fn inspection(asset_id: AssetId, recorded_at: DateTime<Utc>, log: InspectionLog) -> Self {
        Self::new(asset_id, recorded_at, EventDetail::Inspection(log))
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = Some(notes).filter(|n| !n.trim().is_empty());
        self
    }

    pub fn domain(&self) -> EventDomain {
        self.detail.domain()
    }

    pub fn as_reproduction(&self) -> Option<&ReproductionLog> {
        match &self.detail {
            EventDetail::Reproduction(log) => Some(log),
            _ => None,
        }
    }

    pub fn as_production(&self) -> Option<&ProductionLog> {
        match &self.detail {
            EventDetail::Production(log) => Some(log),
            _ => None,
        }
    }

    pub fn as_inspection(&self) -> Option<&InspectionLog> {
        match &self.detail {
            EventDetail::Inspection(log) => Some(log),
            _ => None,
        }
    }
}

impl AssetRecord for FieldEvent {
    fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }
}
