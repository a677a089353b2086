//! `agrimon-advisory`
//!
//! **Responsibility:** turn windowed monitoring records into a short, deduplicated,
//! severity-tagged list of recommendations and a handful of indicators.
//!
//! - Every stage is a pure function over the records it is handed.
//! - Nothing here writes back to storage; records arrive through `RecordSource`.
//! - Findings are transient advisories, not domain records.

pub mod aggregator;
pub mod composer;
pub mod engine;
pub mod evaluator;
pub mod finding;
pub mod indicators;
pub mod resolver;
pub mod source;
pub mod swot;

pub use aggregator::{aggregate, rate_pct};
pub use composer::compose;
pub use engine::{AdvisoryEngine, AdvisoryReport, BlockDigest, Diagnostics, EngineConfig};
pub use evaluator::{LOW_BATTERY_PCT, check_power, evaluate};
pub use finding::{Direction, Finding, FindingKind, Recommendation, Severity};
pub use indicators::{Indicator, IndicatorSnapshot, progress, roll_up, target_findings};
pub use resolver::{latest_by_asset, resolve_latest};
pub use source::{Fetched, RecordSource, SourceError};
pub use swot::{FieldFlags, Swot, swot};

use std::collections::BTreeMap;

use agrimon_core::AssetId;
use agrimon_monitoring::MonitoredAsset;

/// Assets known to the registry, ordered by id.
pub type AssetRegistry = BTreeMap<AssetId, MonitoredAsset>;
