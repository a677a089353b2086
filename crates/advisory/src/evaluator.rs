//! Threshold evaluation of one resolved reading.

use agrimon_monitoring::{Metric, MonitoredAsset, Reading, ThresholdProfile};

use crate::finding::{Direction, Finding, FindingKind, Severity, fmt_beside, fmt_num};

/// Battery level (percent) under which the probe is flagged, whatever the crop.
pub const LOW_BATTERY_PCT: f64 = 20.0;

/// Compare a reading against its asset's profile.
///
/// - No profile: no opinion, empty result.
/// - Bounds are inclusive; in-range values are silent.
/// - Metrics without a bound or without a value are skipped.
/// - Findings follow `Metric::PROFILED` order.
pub fn evaluate(asset: &MonitoredAsset, reading: &Reading, profile: Option<&ThresholdProfile>) -> Vec<Finding> {
    let Some(profile) = profile else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    for metric in Metric::PROFILED {
        let (Some(value), Some(bounds)) = (reading.value(metric), profile.bound(metric)) else {
            continue;
        };

        let (direction, bound) = if value < bounds.low {
            (Direction::Below, bounds.low)
        } else if value > bounds.high {
            (Direction::Above, bounds.high)
        } else {
            continue;
        };

        findings.push(Finding::for_asset(
            asset.id,
            Severity::Attention,
            FindingKind::OutOfRange {
                metric,
                direction,
                value,
                bound,
            },
            out_of_range_message(&asset.name, metric, direction, value, bound),
        ));
    }
    findings
}

/// Fixed low-power rule on the probe battery, independent of any profile.
pub fn check_power(asset: &MonitoredAsset, reading: &Reading) -> Option<Finding> {
    let battery = reading.value(Metric::Battery)?;
    if battery >= LOW_BATTERY_PCT {
        return None;
    }
    Some(Finding::for_asset(
        asset.id,
        Severity::Attention,
        FindingKind::LowPower {
            value: battery,
            threshold: LOW_BATTERY_PCT,
        },
        format!(
            "{}: batterie capteur faible ({}%). Recharger / remplacer pour éviter perte de données.",
            asset.name,
            fmt_beside(battery, LOW_BATTERY_PCT)
        ),
    ))
}

/// A block with no reading in the window cannot be evaluated at all.
pub fn missing_readings(asset: &MonitoredAsset) -> Finding {
    Finding::for_asset(
        asset.id,
        Severity::Attention,
        FindingKind::MissingReadings,
        format!(
            "{}: aucune donnée capteur récente. Ajouter une mesure (7-en-1) pour activer les recommandations.",
            asset.name
        ),
    )
}

fn out_of_range_message(name: &str, metric: Metric, direction: Direction, value: f64, bound: f64) -> String {
    let (phrase, advice) = wording(metric, direction);
    let side = match direction {
        Direction::Below => "min",
        Direction::Above => "max",
    };
    format!(
        "{name}: {phrase} ({}{}), seuil {side} {}. {advice}",
        fmt_beside(value, bound),
        metric.unit(),
        fmt_num(bound)
    )
}

fn wording(metric: Metric, direction: Direction) -> (&'static str, &'static str) {
    use Direction::{Above, Below};

    match (metric, direction) {
        (Metric::Light, Below) => ("luminosité faible", "Vérifier l'ombrage et le placement du capteur."),
        (Metric::Light, Above) => ("luminosité excessive", "Prévoir un ombrage partiel."),
        (Metric::AirTemp, Below) => ("température air basse", "Protéger les jeunes plants du froid."),
        (Metric::AirTemp, Above) => ("température air élevée", "Prévoir ombrage/irrigation."),
        (Metric::AirHumidity, Below) => ("humidité de l'air basse", "Surveiller stress hydrique."),
        (Metric::AirHumidity, Above) => ("humidité de l'air élevée", "Surveiller les risques fongiques."),
        (Metric::SoilTemp, Below) => ("température du sol basse", "Adapter le paillage."),
        (Metric::SoilTemp, Above) => ("température du sol élevée", "Pailler et irriguer aux heures fraîches."),
        (Metric::SoilMoisture, Below) => ("humidité du sol basse", "Prioriser arrosage / paillage."),
        (Metric::SoilMoisture, Above) => ("humidité du sol élevée", "Vérifier drainage / risques de pourriture."),
        (Metric::SoilPh, Below) => ("pH du sol bas", "Ajuster amendements (selon analyse)."),
        (Metric::SoilPh, Above) => ("pH du sol élevé", "Ajuster amendements (selon analyse)."),
        (Metric::Fertility, Below) => ("EC faible", "Envisager fertilisation progressive."),
        (Metric::Fertility, Above) => ("EC élevée", "Risque de salinité: ajuster dosage/lessivage."),
        (Metric::Battery, _) => ("batterie capteur hors plage", "Vérifier l'alimentation du capteur."),
    }
}
