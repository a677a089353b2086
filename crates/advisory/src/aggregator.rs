//! Cross-domain aggregation: reproduction, production and inspection logs.
//!
//! Each check is independent and asset-scoped. Assets are visited in id order and
//! checks run in a fixed order (reproduction, production, inspection staleness,
//! field signals), so output order is reproducible.

use std::collections::BTreeMap;

use agrimon_core::{AssetId, AssetRecord, TimeWindow};
use agrimon_monitoring::{ActivityKind, FieldEvent, MonitoredAsset, Targets};

use crate::AssetRegistry;
use crate::finding::{Finding, FindingKind, Severity, fmt_num};
use crate::resolver::{latest_by_asset, resolve_latest};
use crate::swot::FieldFlags;

/// `numerator / max(denominator, 1)` as a percentage. Never negative, never
/// divides by zero, deliberately not clamped at 100.
pub fn rate_pct(numerator: u64, denominator: u64) -> f64 {
    numerator as f64 / denominator.max(1) as f64 * 100.0
}

/// Run every aggregation check.
///
/// `events` may hold the full history: reproduction, production and field-signal
/// checks only look at `window`, inspection staleness looks at everything.
/// Events for assets missing from `assets` are ignored.
pub fn aggregate(
    assets: &AssetRegistry,
    events: &[FieldEvent],
    targets: &Targets,
    window: &TimeWindow,
    inspected_kinds: &[ActivityKind],
) -> Vec<Finding> {
    let mut findings = reproduction_findings(assets, events, targets, window);
    findings.extend(production_findings(assets, events, targets, window));
    findings.extend(inspection_findings(assets, events, targets, window, inspected_kinds));
    findings.extend(field_signal_findings(assets, events, window));
    findings
}

/// In-window events of known assets, grouped by asset.
fn group_in_window<'a, T>(
    assets: &AssetRegistry,
    events: &'a [FieldEvent],
    window: &TimeWindow,
    select: impl Fn(&'a FieldEvent) -> Option<&'a T>,
) -> BTreeMap<AssetId, Vec<(&'a FieldEvent, &'a T)>> {
    let mut groups: BTreeMap<AssetId, Vec<(&FieldEvent, &T)>> = BTreeMap::new();
    for event in events {
        if !window.includes(event.recorded_at) || !assets.contains_key(&event.asset_id) {
            continue;
        }
        if let Some(detail) = select(event) {
            groups.entry(event.asset_id).or_default().push((event, detail));
        }
    }
    groups
}

/// Mortality against births; deaths without births is a data-quality signal.
pub fn reproduction_findings(
    assets: &AssetRegistry,
    events: &[FieldEvent],
    targets: &Targets,
    window: &TimeWindow,
) -> Vec<Finding> {
    let tolerance = targets.mortality_tolerance_pct();
    let mut findings = Vec::new();

    for (asset_id, logs) in group_in_window(assets, events, window, FieldEvent::as_reproduction) {
        let Some(asset) = assets.get(&asset_id) else {
            continue;
        };
        let births: u64 = logs.iter().map(|(_, l)| u64::from(l.births)).sum();
        let deaths: u64 = logs.iter().map(|(_, l)| u64::from(l.deaths)).sum();

        if births > 0 {
            let rate = rate_pct(deaths, births);
            if rate > tolerance {
                findings.push(Finding::for_asset(
                    asset_id,
                    Severity::Attention,
                    FindingKind::HighMortality {
                        births,
                        deaths,
                        rate_pct: rate,
                        tolerance_pct: tolerance,
                    },
                    format!(
                        "{}: mortalité élevée (~{rate:.1}% pour {births} naissances, tolérance {}%). Renforcer hygiène, alimentation, suivi vétérinaire.",
                        asset.name,
                        fmt_num(tolerance)
                    ),
                ));
            }
        } else if deaths > 0 {
            findings.push(Finding::for_asset(
                asset_id,
                Severity::Attention,
                FindingKind::DeathsWithoutBirths { deaths },
                format!(
                    "{}: {deaths} décès enregistrés sans aucune naissance sur la période. Vérifier la saisie du journal.",
                    asset.name
                ),
            ));
        }
    }
    findings
}

/// Loss rate over produced + lost, and the explicit reprise rate when reported.
pub fn production_findings(
    assets: &AssetRegistry,
    events: &[FieldEvent],
    targets: &Targets,
    window: &TimeWindow,
) -> Vec<Finding> {
    let tolerance = targets.loss_tolerance_pct();
    let mut findings = Vec::new();

    for (asset_id, logs) in group_in_window(assets, events, window, FieldEvent::as_production) {
        let Some(asset) = assets.get(&asset_id) else {
            continue;
        };
        let produced: u64 = logs.iter().map(|(_, l)| u64::from(l.produced)).sum();
        let losses: u64 = logs.iter().map(|(_, l)| u64::from(l.losses)).sum();
        let loss_rate = rate_pct(losses, produced + losses);

        if loss_rate > tolerance {
            findings.push(Finding::for_asset(
                asset_id,
                Severity::Attention,
                FindingKind::HighLoss {
                    produced,
                    losses,
                    rate_pct: loss_rate,
                    tolerance_pct: tolerance,
                },
                format!(
                    "{}: pertes élevées (~{loss_rate:.1}%, tolérance {}%). Ajuster ombrage/arrosage/substrat.",
                    asset.name,
                    fmt_num(tolerance)
                ),
            ));
        }

        let Some(minimum) = targets.min_reprise_rate_pct() else {
            continue;
        };
        let latest_reprise = logs
            .iter()
            .filter_map(|(e, l)| l.reprise_rate_pct.filter(|r| r.is_finite()).map(|r| (*e, r)))
            .max_by_key(|(e, _)| (e.recorded_at(), e.sequence()))
            .map(|(_, r)| r);

        if let Some(rate) = latest_reprise {
            if rate < minimum {
                findings.push(Finding::for_asset(
                    asset_id,
                    Severity::Attention,
                    FindingKind::LowReprise {
                        rate_pct: rate,
                        minimum_pct: minimum,
                    },
                    format!(
                        "{}: taux de reprise faible ({}%, minimum {}%). Revoir acclimatation et conditions de sevrage.",
                        asset.name,
                        fmt_num(rate),
                        fmt_num(minimum)
                    ),
                ));
            }
        }
    }
    findings
}

/// Days since the most recent inspection, over the full history.
pub fn inspection_findings(
    assets: &AssetRegistry,
    events: &[FieldEvent],
    targets: &Targets,
    window: &TimeWindow,
    inspected_kinds: &[ActivityKind],
) -> Vec<Finding> {
    let max_days = targets.inspection_interval_days();
    let inspections: Vec<&FieldEvent> = events.iter().filter(|e| e.as_inspection().is_some()).collect();
    let last_seen = latest_by_asset(&inspections);

    let mut findings = Vec::new();
    for asset in assets.values().filter(|a| inspected_kinds.contains(&a.kind)) {
        match last_seen.get(&asset.id) {
            None => findings.push(never_inspected(asset)),
            Some(last) => {
                let days_since = (window.end - last.recorded_at()).num_days().max(0);
                if days_since > i64::from(max_days) {
                    findings.push(Finding::for_asset(
                        asset.id,
                        Severity::Attention,
                        FindingKind::InspectionOverdue { days_since, max_days },
                        format!(
                            "{}: dernière inspection il y a {days_since} jours (intervalle max {max_days} jours). Planifier une visite.",
                            asset.name
                        ),
                    ));
                }
            }
        }
    }
    findings
}

fn never_inspected(asset: &MonitoredAsset) -> Finding {
    Finding::for_asset(
        asset.id,
        Severity::Attention,
        FindingKind::NeverInspected,
        format!(
            "{}: aucune inspection enregistrée. Planifier une première visite.",
            asset.name
        ),
    )
}

/// Pests/disease declared on the latest in-window inspection of each asset.
pub fn latest_field_flags(
    assets: &AssetRegistry,
    events: &[FieldEvent],
    window: &TimeWindow,
) -> BTreeMap<AssetId, FieldFlags> {
    let inspections: Vec<&FieldEvent> = events
        .iter()
        .filter(|e| e.as_inspection().is_some() && assets.contains_key(&e.asset_id))
        .collect();

    resolve_latest(&inspections, window.start)
        .into_iter()
        .filter_map(|(id, e)| {
            e.as_inspection().map(|log| {
                (
                    id,
                    FieldFlags {
                        pests: log.pests,
                        disease: log.disease,
                    },
                )
            })
        })
        .collect()
}

/// Disease is critical; pests call for attention.
pub fn field_signal_findings(assets: &AssetRegistry, events: &[FieldEvent], window: &TimeWindow) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (asset_id, flags) in latest_field_flags(assets, events, window) {
        let Some(asset) = assets.get(&asset_id) else {
            continue;
        };
        if flags.disease {
            findings.push(Finding::for_asset(
                asset_id,
                Severity::Critical,
                FindingKind::FieldSignal {
                    pests: flags.pests,
                    disease: true,
                },
                format!(
                    "{}: maladie déclarée lors de la dernière observation. Isoler et traiter rapidement.",
                    asset.name
                ),
            ));
        }
        if flags.pests {
            findings.push(Finding::for_asset(
                asset_id,
                Severity::Attention,
                FindingKind::FieldSignal {
                    pests: true,
                    disease: flags.disease,
                },
                format!(
                    "{}: ravageurs/parasites signalés lors de la dernière observation. Renforcer surveillance & traitement adapté.",
                    asset.name
                ),
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrimon_monitoring::{EventDetail, InspectionLog, ProductionLog};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::trailing_days(now(), 30)
    }

    fn asset(n: u128, kind: ActivityKind, name: &str) -> MonitoredAsset {
        MonitoredAsset::new(
            AssetId::from_uuid(Uuid::from_u128(n)),
            kind,
            name,
            None,
            now() - Duration::days(365),
        )
        .unwrap()
    }

    fn registry(assets: Vec<MonitoredAsset>) -> AssetRegistry {
        assets.into_iter().map(|a| (a.id, a)).collect()
    }

    fn days_ago(d: i64) -> DateTime<Utc> {
        now() - Duration::days(d)
    }

    #[test]
    fn deaths_without_births_is_a_data_quality_signal_only() {
        let unit = asset(1, ActivityKind::RabbitUnit, "Clapier principal");
        let events = vec![
            FieldEvent::reproduction(unit.id, days_ago(3), 0, 2),
            FieldEvent::reproduction(unit.id, days_ago(1), 0, 1),
        ];
        let assets = registry(vec![unit]);

        let findings = reproduction_findings(&assets, &events, &Targets::default(), &window());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::DeathsWithoutBirths { deaths: 3 });
        assert!(findings[0].message.contains("3 décès"));
    }

    #[test]
    fn mortality_above_tolerance_is_flagged() {
        let unit = asset(1, ActivityKind::RabbitUnit, "Clapier");
        let events = vec![FieldEvent::reproduction(unit.id, days_ago(2), 20, 5)];
        let assets = registry(vec![unit]);
        let targets = Targets {
            loss_tolerance_pct: Some(10.0),
            ..Targets::default()
        };

        let findings = reproduction_findings(&assets, &events, &targets, &window());
        assert_eq!(findings.len(), 1);
        match &findings[0].kind {
            FindingKind::HighMortality { rate_pct, .. } => assert!((rate_pct - 25.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
        assert!(findings[0].message.contains("~25.0%"));

        let lenient = Targets {
            mortality_tolerance_pct: Some(30.0),
            ..targets
        };
        assert!(reproduction_findings(&assets, &events, &lenient, &window()).is_empty());
    }

    #[test]
    fn events_outside_the_window_are_ignored_for_rates() {
        let unit = asset(1, ActivityKind::RabbitUnit, "Clapier");
        let events = vec![FieldEvent::reproduction(unit.id, days_ago(45), 0, 9)];
        let assets = registry(vec![unit]);
        assert!(reproduction_findings(&assets, &events, &Targets::default(), &window()).is_empty());
    }

    #[test]
    fn nursery_loss_rate_uses_produced_plus_losses() {
        let lot = asset(1, ActivityKind::NurseryLot, "Lot PIF");
        let events = vec![FieldEvent::production(lot.id, days_ago(5), 100, 30)];
        let assets = registry(vec![lot]);
        let targets = Targets {
            loss_tolerance_pct: Some(10.0),
            min_reprise_rate_pct: Some(80.0),
            ..Targets::default()
        };

        let findings = production_findings(&assets, &events, &targets, &window());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("~23.1%"));
        assert!(matches!(findings[0].kind, FindingKind::HighLoss { produced: 100, losses: 30, .. }));
    }

    #[test]
    fn reprise_check_is_independent_and_uses_the_latest_value() {
        let lot = asset(1, ActivityKind::NurseryLot, "Lot PIF");
        let with_reprise = |d: i64, seq: u64, rate: f64| {
            FieldEvent::new(
                lot.id,
                days_ago(d),
                EventDetail::Production(ProductionLog {
                    produced: 100,
                    transplanted: 0,
                    losses: 0,
                    reprise_rate_pct: Some(rate),
                }),
            )
            .with_sequence(seq)
        };
        let events = vec![with_reprise(1, 2, 60.0), with_reprise(6, 1, 95.0)];
        let assets = registry(vec![lot.clone()]);
        let targets = Targets {
            min_reprise_rate_pct: Some(80.0),
            ..Targets::default()
        };

        let findings = production_findings(&assets, &events, &targets, &window());
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].kind,
            FindingKind::LowReprise {
                rate_pct: 60.0,
                minimum_pct: 80.0
            }
        );

        // Without a configured minimum the check does not run.
        assert!(production_findings(&assets, &events, &Targets::default(), &window()).is_empty());
    }

    #[test]
    fn empty_production_does_not_divide_by_zero() {
        let lot = asset(1, ActivityKind::NurseryLot, "Lot vide");
        let events = vec![FieldEvent::production(lot.id, days_ago(1), 0, 0)];
        let assets = registry(vec![lot]);
        assert!(production_findings(&assets, &events, &Targets::default(), &window()).is_empty());
    }

    #[test]
    fn staleness_uses_full_history_and_flags_never_inspected() {
        let hive_old = asset(1, ActivityKind::Hive, "Ruche 1");
        let hive_new = asset(2, ActivityKind::Hive, "Ruche 2");
        let hive_none = asset(3, ActivityKind::Hive, "Ruche 3");
        let rabbits = asset(4, ActivityKind::RabbitUnit, "Clapier");
        let events = vec![
            FieldEvent::inspection(hive_old.id, days_ago(40), InspectionLog::default()),
            FieldEvent::inspection(hive_new.id, days_ago(3), InspectionLog::default()),
        ];
        let assets = registry(vec![hive_old, hive_new, hive_none, rabbits]);

        let findings = inspection_findings(
            &assets,
            &events,
            &Targets::default(),
            &window(),
            &[ActivityKind::Hive],
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[0].kind,
            FindingKind::InspectionOverdue {
                days_since: 40,
                max_days: 14
            }
        );
        assert!(findings[0].message.starts_with("Ruche 1"));
        assert_eq!(findings[1].kind, FindingKind::NeverInspected);
        assert!(findings[1].message.starts_with("Ruche 3"));
    }

    #[test]
    fn disease_is_critical_and_pests_need_attention() {
        let block = asset(1, ActivityKind::CultivatedBlock, "Bloc A");
        let events = vec![
            FieldEvent::inspection(
                block.id,
                days_ago(10),
                InspectionLog {
                    pests: true,
                    ..InspectionLog::default()
                },
            ),
            FieldEvent::inspection(
                block.id,
                days_ago(2),
                InspectionLog {
                    disease: true,
                    ..InspectionLog::default()
                },
            ),
        ];
        let assets = registry(vec![block]);

        let findings = field_signal_findings(&assets, &events, &window());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    fn inspected(id: AssetId, d: i64, pests: bool, disease: bool) -> FieldEvent {
        FieldEvent::inspection(
            id,
            days_ago(d),
            InspectionLog {
                pests,
                disease,
                ..InspectionLog::default()
            },
        )
    }

    #[test]
    fn pests_alone_need_attention() {
        let hive = asset(1, ActivityKind::Hive, "Ruche 1");
        let events = vec![inspected(hive.id, 20, false, true), inspected(hive.id, 2, true, false)];
        let assets = registry(vec![hive]);

        let findings = field_signal_findings(&assets, &events, &window());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Attention);
        assert_eq!(
            findings[0].kind,
            FindingKind::FieldSignal {
                pests: true,
                disease: false
            }
        );
        assert!(findings[0].message.starts_with("Ruche 1: ravageurs/parasites signalés"));
    }

    #[test]
    fn disease_and_pests_give_critical_then_attention() {
        let block = asset(1, ActivityKind::CultivatedBlock, "Bloc A");
        let events = vec![inspected(block.id, 1, true, true)];
        let assets = registry(vec![block]);

        let findings = field_signal_findings(&assets, &events, &window());
        let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Critical, Severity::Attention]);
        assert!(findings[0].message.contains("maladie déclarée"));
        assert!(findings[1].message.contains("ravageurs/parasites"));
    }

    #[test]
    fn signals_older_than_the_window_are_ignored() {
        let block = asset(1, ActivityKind::CultivatedBlock, "Bloc A");
        let events = vec![inspected(block.id, 45, true, true)];
        let assets = registry(vec![block]);
        assert!(field_signal_findings(&assets, &events, &window()).is_empty());
    }

    #[test]
    fn overdue_only_past_the_interval() {
        let hive = asset(1, ActivityKind::Hive, "Ruche 1");
        let targets = Targets {
            inspection_interval_days: Some(14),
            ..Targets::default()
        };
        let assets = registry(vec![hive.clone()]);
        let check = |d: i64| {
            let events = vec![inspected(hive.id, d, false, false)];
            inspection_findings(&assets, &events, &targets, &window(), &[ActivityKind::Hive])
        };

        assert!(check(14).is_empty());
        let late = check(15);
        assert_eq!(late.len(), 1);
        assert_eq!(
            late[0].kind,
            FindingKind::InspectionOverdue {
                days_since: 15,
                max_days: 14
            }
        );
    }

    #[test]
    fn aggregate_runs_checks_in_fixed_order_and_skips_unknown_assets() {
        let unit = asset(1, ActivityKind::RabbitUnit, "Clapier");
        let lot = asset(2, ActivityKind::NurseryLot, "Lot");
        let stranger = AssetId::from_uuid(Uuid::from_u128(99));
        let events = vec![
            FieldEvent::production(lot.id, days_ago(1), 10, 10),
            FieldEvent::reproduction(unit.id, days_ago(1), 0, 1),
            FieldEvent::reproduction(stranger, days_ago(1), 0, 50),
        ];
        let assets = registry(vec![unit, lot]);

        let findings = aggregate(&assets, &events, &Targets::default(), &window(), &[]);
        let kinds: Vec<_> = findings.iter().map(|f| std::mem::discriminant(&f.kind)).collect();
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0], std::mem::discriminant(&FindingKind::DeathsWithoutBirths { deaths: 0 }));
        assert!(matches!(findings[1].kind, FindingKind::HighLoss { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: rates are finite and non-negative for any counts, zero included.
        #[test]
        fn rates_are_bounded_below_and_finite(n in 0u64..1_000_000, d in 0u64..1_000_000) {
            let r = rate_pct(n, d);
            prop_assert!(r.is_finite());
            prop_assert!(r >= 0.0);
            if d == 0 {
                prop_assert_eq!(r, n as f64 * 100.0);
            }
        }

        /// Property: loss rate over produced + lost never exceeds 100%.
        #[test]
        fn loss_share_stays_within_percent(produced in 0u64..100_000, losses in 0u64..100_000) {
            let r = rate_pct(losses, produced + losses);
            prop_assert!((0.0..=100.0).contains(&r));
        }
    }
}
