//! Window totals and progress against operator targets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agrimon_core::TimeWindow;
use agrimon_monitoring::{ActivityKind, EventDetail, FieldEvent, Targets};

use crate::AssetRegistry;
use crate::aggregator::rate_pct;
use crate::finding::{Finding, FindingKind, Severity, fmt_num};

/// Totals over the window, across all known assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub births: u64,
    pub deaths: u64,
    /// `None` when no birth was logged.
    pub mortality_rate_pct: Option<f64>,
    pub honey_kg: f64,
    pub inspections: u64,
    pub produced: u64,
    pub transplanted: u64,
    pub losses: u64,
    /// `None` when nothing was produced or lost.
    pub loss_rate_pct: Option<f64>,
    pub assets_by_kind: BTreeMap<ActivityKind, u64>,
}

impl IndicatorSnapshot {
    pub fn assets_of(&self, kind: ActivityKind) -> u64 {
        self.assets_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// One actual value paired with its goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub key: String,
    pub label: String,
    pub actual: f64,
    pub target: f64,
    /// `actual / target * 100`, uncapped.
    pub attainment_pct: f64,
    pub on_track: bool,
}

impl Indicator {
    fn reach(key: &str, label: &str, actual: f64, target: f64) -> Self {
        let attainment_pct = actual / target * 100.0;
        Self {
            key: key.to_string(),
            label: label.to_string(),
            actual,
            target,
            attainment_pct,
            on_track: actual >= target,
        }
    }
}

/// Sum every in-window event of a known asset; count assets per kind.
pub fn roll_up(assets: &AssetRegistry, events: &[FieldEvent], window: &TimeWindow) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::default();

    for asset in assets.values() {
        *snap.assets_by_kind.entry(asset.kind).or_default() += 1;
    }

    for event in events
        .iter()
        .filter(|e| window.includes(e.recorded_at) && assets.contains_key(&e.asset_id))
    {
        match &event.detail {
            EventDetail::Reproduction(log) => {
                snap.births += u64::from(log.births);
                snap.deaths += u64::from(log.deaths);
            }
            EventDetail::Production(log) => {
                snap.produced += u64::from(log.produced);
                snap.transplanted += u64::from(log.transplanted);
                snap.losses += u64::from(log.losses);
            }
            EventDetail::Inspection(log) => {
                snap.inspections += 1;
                snap.honey_kg += log.honey_kg.filter(|kg| kg.is_finite() && *kg > 0.0).unwrap_or(0.0);
            }
        }
    }

    snap.mortality_rate_pct = (snap.births > 0).then(|| rate_pct(snap.deaths, snap.births));
    let flow = snap.produced + snap.losses;
    snap.loss_rate_pct = (flow > 0).then(|| rate_pct(snap.losses, flow));
    snap
}

/// Pair actuals with the targets that are set (unset or zero targets are skipped).
pub fn progress(snapshot: &IndicatorSnapshot, targets: &Targets) -> Vec<Indicator> {
    let goals = [
        (
            "hives_installed",
            "Ruches installées",
            snapshot.assets_of(ActivityKind::Hive),
            targets.hives_count,
        ),
        (
            "nursery_lots",
            "Lots de pépinière",
            snapshot.assets_of(ActivityKind::NurseryLot),
            targets.nursery_lots_count,
        ),
        ("rabbits_per_cycle", "Lapereaux par cycle", snapshot.births, targets.rabbits_per_cycle),
        ("plants_per_cycle", "Plants par cycle", snapshot.produced, targets.plants_per_cycle),
    ];

    let mut out: Vec<Indicator> = goals
        .into_iter()
        .filter_map(|(key, label, actual, target)| {
            let target = target.filter(|t| *t > 0)?;
            Some(Indicator::reach(key, label, actual as f64, f64::from(target)))
        })
        .collect();

    if let (Some(tolerance), Some(rate)) = (
        targets.loss_tolerance_pct.filter(|t| *t > 0.0),
        snapshot.loss_rate_pct,
    ) {
        out.push(Indicator {
            key: "loss_rate".to_string(),
            label: "Taux de pertes (%)".to_string(),
            actual: rate,
            target: tolerance,
            attainment_pct: rate / tolerance * 100.0,
            on_track: rate <= tolerance,
        });
    }
    out
}

/// Installation goals not yet met.
pub fn target_findings(snapshot: &IndicatorSnapshot, targets: &Targets) -> Vec<Finding> {
    let goals = [
        (ActivityKind::Hive, "Ruches", targets.hives_count),
        (ActivityKind::NurseryLot, "Lots de pépinière", targets.nursery_lots_count),
    ];

    goals
        .into_iter()
        .filter_map(|(activity, label, target)| {
            let target = u64::from(target.filter(|t| *t > 0)?);
            let installed = snapshot.assets_of(activity);
            (installed < target).then(|| {
                Finding::new(
                    None,
                    Severity::Attention,
                    FindingKind::TargetShortfall {
                        activity,
                        installed,
                        target,
                    },
                    format!(
                        "{label}: {installed}/{target} installées. Planifier installation/extension."
                    ),
                )
            })
        })
        .collect()
}

/// Human summary of a snapshot, used in log lines.
pub(crate) fn summary(snapshot: &IndicatorSnapshot) -> String {
    format!(
        "births={} deaths={} produced={} losses={} honey_kg={}",
        snapshot.births,
        snapshot.deaths,
        snapshot.produced,
        snapshot.losses,
        fmt_num(snapshot.honey_kg)
    )
}
