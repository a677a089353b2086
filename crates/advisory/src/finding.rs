use serde::{Deserialize, Serialize};

use agrimon_core::AssetId;
use agrimon_monitoring::{ActivityKind, Metric};

/// Urgency of a finding or recommendation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Attention,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Attention => "ATTENTION",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the acceptable interval a value fell on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Below,
    Above,
}

/// What was detected. Carries the numbers behind the rendered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    OutOfRange {
        metric: Metric,
        direction: Direction,
        value: f64,
        bound: f64,
    },
    LowPower {
        value: f64,
        threshold: f64,
    },
    MissingReadings,
    HighMortality {
        births: u64,
        deaths: u64,
        rate_pct: f64,
        tolerance_pct: f64,
    },
    /// Deaths logged with no births in the window: a data-quality signal.
    DeathsWithoutBirths {
        deaths: u64,
    },
    HighLoss {
        produced: u64,
        losses: u64,
        rate_pct: f64,
        tolerance_pct: f64,
    },
    LowReprise {
        rate_pct: f64,
        minimum_pct: f64,
    },
    InspectionOverdue {
        days_since: i64,
        max_days: u32,
    },
    NeverInspected,
    FieldSignal {
        pests: bool,
        disease: bool,
    },
    TargetShortfall {
        activity: ActivityKind,
        installed: u64,
        target: u64,
    },
}

/// A single detected condition, already rendered for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// `None` for deployment-wide findings (target shortfalls).
    pub asset_id: Option<AssetId>,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    pub fn new(asset_id: Option<AssetId>, severity: Severity, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            asset_id,
            severity,
            kind,
            message: message.into(),
        }
    }

    pub fn for_asset(asset_id: AssetId, severity: Severity, kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(Some(asset_id), severity, kind, message)
    }
}

/// Deduplicated, severity-tagged advisory surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
}

impl Recommendation {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl From<&Finding> for Recommendation {
    fn from(f: &Finding) -> Self {
        Self::new(f.severity, f.message.clone())
    }
}

/// Render a measured value the way operators write it: `40`, `6.5`, `1234.57`.
pub(crate) fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        return format!("{v:.0}");
    }
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `fmt_num(value)`, unless rounding would print it as `reference` while the two
/// differ; then the shortest exact form is used.
pub(crate) fn fmt_beside(value: f64, reference: f64) -> String {
    let shown = fmt_num(value);
    if value != reference && shown == fmt_num(reference) {
        return format!("{value}");
    }
    shown
}
