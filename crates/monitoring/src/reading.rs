use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrimon_core::{AssetId, AssetRecord};

/// Sensor metric reported by the 7-in-1 probe (plus its battery).
///
/// Declaration order is the evaluation order: findings come out in this order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Light,
    AirTemp,
    AirHumidity,
    SoilTemp,
    SoilMoisture,
    SoilPh,
    Fertility,
    Battery,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Light,
        Metric::AirTemp,
        Metric::AirHumidity,
        Metric::SoilTemp,
        Metric::SoilMoisture,
        Metric::SoilPh,
        Metric::Fertility,
        Metric::Battery,
    ];

    /// Metrics evaluated against per-category profiles.
    ///
    /// The battery is a soft-alert field with a fixed system rule instead.
    pub const PROFILED: [Metric; 7] = [
        Metric::Light,
        Metric::AirTemp,
        Metric::AirHumidity,
        Metric::SoilTemp,
        Metric::SoilMoisture,
        Metric::SoilPh,
        Metric::Fertility,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::Light => "light",
            Metric::AirTemp => "air_temp",
            Metric::AirHumidity => "air_humidity",
            Metric::SoilTemp => "soil_temp",
            Metric::SoilMoisture => "soil_moisture",
            Metric::SoilPh => "soil_ph",
            Metric::Fertility => "fertility",
            Metric::Battery => "battery",
        }
    }

    pub fn from_key(key: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.key() == key.trim())
    }

    /// Unit suffix used when rendering a value.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Light => " lux",
            Metric::AirTemp | Metric::SoilTemp => "°C",
            Metric::AirHumidity | Metric::SoilMoisture | Metric::Battery => "%",
            Metric::SoilPh => "",
            Metric::Fertility => " µS/cm",
        }
    }

    pub fn is_soft_alert(&self) -> bool {
        matches!(self, Metric::Battery)
    }
}

impl core::fmt::Display for Metric {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

/// One probe measurement for an asset.
///
/// Every metric is optional: an absent value is "not measured", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub asset_id: AssetId,
    pub recorded_at: DateTime<Utc>,
    /// Store-assigned insertion order.
    #[serde(default)]
    pub sequence: u64,
    pub light: Option<f64>,
    pub air_temp: Option<f64>,
    pub air_humidity: Option<f64>,
    pub soil_temp: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub soil_ph: Option<f64>,
    pub fertility: Option<f64>,
    pub battery: Option<f64>,
}

impl Reading {
    /// Empty reading (no metric measured yet).
    pub fn new(asset_id: AssetId, recorded_at: DateTime<Utc>) -> Self {
        Self {
            asset_id,
            recorded_at,
            sequence: 0,
            light: None,
            air_temp: None,
            air_humidity: None,
            soil_temp: None,
            soil_moisture: None,
            soil_ph: None,
            fertility: None,
            battery: None,
        }
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Light => &mut self.light,
            Metric::AirTemp => &mut self.air_temp,
            Metric::AirHumidity => &mut self.air_humidity,
            Metric::SoilTemp => &mut self.soil_temp,
            Metric::SoilMoisture => &mut self.soil_moisture,
            Metric::SoilPh => &mut self.soil_ph,
            Metric::Fertility => &mut self.fertility,
            Metric::Battery => &mut self.battery,
        };
        *slot = value;
    }

    /// Measured value for `metric`, if present and numeric.
    ///
    /// NaN and infinities count as "not measured".
    pub fn value(&self, metric: Metric) -> Option<f64> {
        let v = match metric {
            Metric::Light => self.light,
            Metric::AirTemp => self.air_temp,
            Metric::AirHumidity => self.air_humidity,
            Metric::SoilTemp => self.soil_temp,
            Metric::SoilMoisture => self.soil_moisture,
            Metric::SoilPh => self.soil_ph,
            Metric::Fertility => self.fertility,
            Metric::Battery => self.battery,
        };
        v.filter(|x| x.is_finite())
    }

    /// Present metrics in declaration order.
    pub fn measured(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|m| self.value(m).map(|v| (m, v)))
    }
}

impl AssetRecord for Reading {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for m in Metric::ALL {
            assert_eq!(Metric::from_key(m.key()), Some(m));
        }
        assert_eq!(Metric::from_key("co2"), None);
    }

    #[test]
    fn non_finite_values_are_absent() {
        let r = Reading::new(AssetId::new(), Utc::now())
            .with(Metric::SoilPh, f64::NAN)
            .with(Metric::Light, f64::INFINITY)
            .with(Metric::SoilMoisture, 0.0);
        assert_eq!(r.value(Metric::SoilPh), None);
        assert_eq!(r.value(Metric::Light), None);
        assert_eq!(r.value(Metric::SoilMoisture), Some(0.0));
        assert_eq!(r.measured().collect::<Vec<_>>(), vec![(Metric::SoilMoisture, 0.0)]);
    }

    #[test]
    fn battery_is_not_profiled() {
        assert!(!Metric::PROFILED.contains(&Metric::Battery));
        assert!(Metric::Battery.is_soft_alert());
    }
}
