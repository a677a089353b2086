//! End-to-end tests: stored rows → ingestion → store → engine → report.
//!
//! Verifies:
//! - The reference scenarios (low soil moisture, rabbit deaths without births,
//!   nursery losses) produce exactly the expected recommendations
//! - Reports are idempotent for unchanged inputs and see target edits immediately
//! - Malformed stored rows are counted, never fatal

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    use agrimon_advisory::composer::STABLE_MESSAGE;
    use agrimon_advisory::{AdvisoryEngine, EngineConfig, Severity};
    use agrimon_core::AssetId;
    use agrimon_monitoring::{
        ActivityKind, FieldEvent, InspectionLog, Metric, MonitoredAsset, RawEvent, RawReading, Reading, Targets,
    };

    use crate::store::InMemoryRecordStore;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn setup() -> (Arc<InMemoryRecordStore>, AdvisoryEngine<Arc<InMemoryRecordStore>>) {
        agrimon_observability::init();
        let store = Arc::new(InMemoryRecordStore::new());
        let engine = AdvisoryEngine::new(Arc::clone(&store), EngineConfig::default());
        (store, engine)
    }

    fn register(store: &InMemoryRecordStore, kind: ActivityKind, name: &str, category: Option<&str>) -> AssetId {
        let asset = MonitoredAsset::new(
            AssetId::new(),
            kind,
            name,
            category.map(str::to_string),
            now() - Duration::days(200),
        )
        .unwrap();
        let id = asset.id;
        store.register_asset(asset).unwrap();
        id
    }

    fn readings(rows: serde_json::Value) -> Vec<RawReading> {
        serde_json::from_value(rows).unwrap()
    }

    fn events(rows: serde_json::Value) -> Vec<RawEvent> {
        serde_json::from_value(rows).unwrap()
    }

    #[test]
    fn low_soil_moisture_block_yields_one_recommendation() {
        let (store, engine) = setup();
        let block = register(&store, ActivityKind::CultivatedBlock, "Block A", Some("banane"));

        store
            .ingest_raw_readings(readings(json!([
                {"reading_id": 1, "asset_id": block.to_string(), "date": "2025-06-20T08:00:00",
                 "soil_moisture": 75, "soil_ph": 6.2},
                {"reading_id": 2, "asset_id": block.to_string(), "date": "2025-06-30T08:00:00",
                 "soil_moisture": "40"}
            ])))
            .unwrap();
        store
            .ingest_raw_events(events(json!([
                {"obs_id": 1, "asset_id": block.to_string(), "date": "2025-06-29", "domain": "field_observation",
                 "pests": 0, "disease": 0}
            ])))
            .unwrap();

        let report = engine.generate_recommendations_at(30, now());
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].severity, Severity::Attention);
        assert!(report.recommendations[0]
            .message
            .starts_with("Block A: humidité du sol basse (40%)"));
        assert!(report.diagnostics.is_clean());
    }

    #[test]
    fn rabbit_deaths_without_births_is_a_data_quality_signal() {
        let (store, engine) = setup();
        let unit = register(&store, ActivityKind::RabbitUnit, "Clapier principal", None);
        store
            .ingest_raw_events(events(json!([
                {"log_id": 1, "asset_id": unit.to_string(), "date": "2025-06-25", "domain": "rabbit_log",
                 "births": 0, "deaths": 2},
                {"log_id": 2, "asset_id": unit.to_string(), "date": "2025-06-28", "domain": "rabbit_log",
                 "births": 0, "deaths": 1}
            ])))
            .unwrap();

        let report = engine.generate_recommendations_at(30, now());
        assert_eq!(report.recommendations.len(), 1);
        let message = &report.recommendations[0].message;
        assert!(message.contains("3 décès"));
        assert!(!message.contains("mortalité"));
        assert_eq!(report.snapshot.mortality_rate_pct, None);
    }

    #[test]
    fn nursery_losses_above_tolerance_yield_one_finding() {
        let (store, engine) = setup();
        let lot = register(&store, ActivityKind::NurseryLot, "Lot PIF 3", Some("PIF"));
        store
            .set_targets(Targets {
                loss_tolerance_pct: Some(10.0),
                min_reprise_rate_pct: Some(70.0),
                ..Targets::default()
            })
            .unwrap();
        store
            .append_event(FieldEvent::production(lot, now() - Duration::days(3), 100, 30))
            .unwrap();

        let report = engine.generate_recommendations_at(30, now());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].message.contains("23.1%"));
        assert_eq!(report.indicators.len(), 1);
        assert!(!report.indicators[0].on_track);
    }

    #[test]
    fn empty_deployment_reports_stability() {
        let (_store, engine) = setup();
        let report = engine.generate_recommendations_at(30, now());
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].severity, Severity::Ok);
        assert_eq!(report.recommendations[0].message, STABLE_MESSAGE);
    }

    #[test]
    fn repeated_calls_are_idempotent() {
        let (store, engine) = setup();
        let block = register(&store, ActivityKind::CultivatedBlock, "Bloc Taro", Some("taro"));
        let hive = register(&store, ActivityKind::Hive, "Ruche 1", None);
        store
            .ingest_raw_readings(readings(json!([
                {"asset_id": block.to_string(), "date": "2025-06-30 06:00:00", "soil_ph": 8.1, "battery": 12}
            ])))
            .unwrap();
        store
            .append_event(FieldEvent::inspection(
                hive,
                now() - Duration::days(2),
                InspectionLog {
                    pests: true,
                    honey_kg: Some(3.0),
                    ..InspectionLog::default()
                },
            ))
            .unwrap();

        let first = engine.generate_recommendations_at(30, now());
        let second = engine.generate_recommendations_at(30, now());
        assert_eq!(first, second);
        assert!(first.recommendations.len() >= 3);
    }

    #[test]
    fn target_edits_are_seen_by_the_next_call() {
        let (store, engine) = setup();
        let hive = register(&store, ActivityKind::Hive, "Ruche 1", None);
        store
            .append_event(FieldEvent::inspection(hive, now() - Duration::days(1), InspectionLog::default()))
            .unwrap();

        let before = engine.generate_recommendations_at(30, now());
        assert_eq!(before.recommendations[0].severity, Severity::Ok);

        store
            .set_targets(Targets {
                hives_count: Some(2),
                ..Targets::default()
            })
            .unwrap();
        let after = engine.generate_recommendations_at(30, now());
        assert_eq!(after.recommendations.len(), 1);
        assert_eq!(
            after.recommendations[0].message,
            "Ruches: 1/2 installées. Planifier installation/extension."
        );
    }

    #[test]
    fn malformed_timestamps_are_counted_not_fatal() {
        let (store, engine) = setup();
        let block = register(&store, ActivityKind::CultivatedBlock, "Block A", Some("banane"));
        let report = store
            .ingest_raw_readings(readings(json!([
                {"asset_id": block.to_string(), "date": "30/06/2025", "soil_moisture": 10},
                {"asset_id": block.to_string(), "date": "", "soil_moisture": 10},
                {"asset_id": block.to_string(), "date": "2025-06-30T09:00:00Z", "soil_moisture": 70}
            ])))
            .unwrap();
        assert_eq!(report.skipped, 2);
        store
            .append_event(FieldEvent::inspection(block, now(), InspectionLog::default()))
            .unwrap();

        let out = engine.generate_recommendations_at(30, now());
        assert_eq!(out.diagnostics.skipped_records, 2);
        assert_eq!(out.recommendations[0].message, STABLE_MESSAGE);
    }

    #[test]
    fn staleness_looks_past_the_window() {
        let (store, engine) = setup();
        let hive = register(&store, ActivityKind::Hive, "Ruche 2", None);
        store
            .append_event(FieldEvent::inspection(hive, now() - Duration::days(20), InspectionLog::default()))
            .unwrap();

        let report = engine.generate_recommendations_at(7, now());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].message.contains("il y a 20 jours"));
    }

    #[test]
    fn orphan_records_are_ignored_and_counted() {
        let (store, engine) = setup();
        store
            .append_event(FieldEvent::reproduction(AssetId::new(), now(), 0, 9))
            .unwrap();
        let report = engine.generate_recommendations_at(30, now());
        assert_eq!(report.diagnostics.orphan_records, 1);
        assert_eq!(report.recommendations[0].message, STABLE_MESSAGE);
    }

    #[test]
    fn report_serializes_for_presentation() {
        let (store, engine) = setup();
        register(&store, ActivityKind::CultivatedBlock, "Block A", Some("banane"));
        let report = engine.generate_recommendations_at(30, now());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["recommendations"][0]["severity"], "ATTENTION");
        assert_eq!(json["blocks"][0]["name"], "Block A");
        assert_eq!(json["window_days"], 30);
    }

    #[test]
    fn concurrent_reads_during_writes_stay_consistent() {
        let (store, engine) = setup();
        let block = register(&store, ActivityKind::CultivatedBlock, "Block A", Some("banane"));
        store
            .append_event(FieldEvent::inspection(block, now(), InspectionLog::default()))
            .unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let at = now() - Duration::minutes(i);
                    store
                        .append_reading(
                            Reading::new(block, at).with(Metric::SoilMoisture, 70.0),
                        )
                        .unwrap();
                }
            });
            for _ in 0..20 {
                s.spawn(|| {
                    let report = engine.generate_recommendations_at(30, now());
                    assert!(!report.recommendations.is_empty());
                });
            }
        });

        assert_eq!(store.len(), 201);
    }
}
