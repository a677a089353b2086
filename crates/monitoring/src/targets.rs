use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrimon_core::{DomainError, DomainResult};

/// Loss tolerance applied when the operator has not set one.
pub const DEFAULT_LOSS_TOLERANCE_PCT: f64 = 10.0;

/// Maximum days between inspections applied when the operator has not set one.
pub const DEFAULT_INSPECTION_INTERVAL_DAYS: u32 = 14;

/// Operator-set goals and tolerances.
///
/// Singleton per deployment, editable at any time. Unset fields fall back to the
/// constants above where a fallback exists, and disable the check otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    /// Tolerated loss percentage (nursery losses, and mortality when no
    /// dedicated mortality tolerance is set).
    pub loss_tolerance_pct: Option<f64>,
    pub mortality_tolerance_pct: Option<f64>,
    pub inspection_interval_days: Option<u32>,
    /// Minimum acceptable reprise (success) rate for nursery lots.
    pub min_reprise_rate_pct: Option<f64>,
    pub hives_count: Option<u32>,
    pub nursery_lots_count: Option<u32>,
    pub rabbits_per_cycle: Option<u32>,
    pub plants_per_cycle: Option<u32>,
    /// Annual revenue goals (FCFA), informational.
    pub banana_revenue: Option<u64>,
    pub taro_revenue: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Targets {
    /// The values pre-filled in the operator's target form.
    pub fn suggested() -> Self {
        Self {
            loss_tolerance_pct: Some(DEFAULT_LOSS_TOLERANCE_PCT),
            hives_count: Some(2),
            rabbits_per_cycle: Some(540),
            plants_per_cycle: Some(1000),
            banana_revenue: Some(33_320_000),
            taro_revenue: Some(5_000_000),
            ..Self::default()
        }
    }

    pub fn loss_tolerance_pct(&self) -> f64 {
        self.loss_tolerance_pct.unwrap_or(DEFAULT_LOSS_TOLERANCE_PCT)
    }

    /// Mortality tolerance, falling back to the loss tolerance, then the default.
    pub fn mortality_tolerance_pct(&self) -> f64 {
        self.mortality_tolerance_pct
            .unwrap_or_else(|| self.loss_tolerance_pct())
    }

    pub fn inspection_interval_days(&self) -> u32 {
        self.inspection_interval_days
            .unwrap_or(DEFAULT_INSPECTION_INTERVAL_DAYS)
    }

    /// `None` disables the reprise-rate check.
    pub fn min_reprise_rate_pct(&self) -> Option<f64> {
        self.min_reprise_rate_pct
    }

    pub fn validate(&self) -> DomainResult<()> {
        let pcts = [
            ("loss_tolerance_pct", self.loss_tolerance_pct),
            ("mortality_tolerance_pct", self.mortality_tolerance_pct),
            ("min_reprise_rate_pct", self.min_reprise_rate_pct),
        ];
        for (name, v) in pcts {
            if let Some(v) = v {
                if !v.is_finite() || v < 0.0 {
                    return Err(DomainError::validation(format!(
                        "{name} must be a finite, non-negative percentage (got {v})"
                    )));
                }
            }
        }
        if self.inspection_interval_days == Some(0) {
            return Err(DomainError::validation("inspection_interval_days must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_targets_use_fallbacks() {
        let t = Targets::default();
        assert_eq!(t.loss_tolerance_pct(), DEFAULT_LOSS_TOLERANCE_PCT);
        assert_eq!(t.mortality_tolerance_pct(), DEFAULT_LOSS_TOLERANCE_PCT);
        assert_eq!(t.inspection_interval_days(), DEFAULT_INSPECTION_INTERVAL_DAYS);
        assert_eq!(t.min_reprise_rate_pct(), None);
    }

    #[test]
    fn mortality_falls_back_to_loss_tolerance() {
        let t = Targets {
            loss_tolerance_pct: Some(5.0),
            ..Targets::default()
        };
        assert_eq!(t.mortality_tolerance_pct(), 5.0);

        let t = Targets {
            loss_tolerance_pct: Some(5.0),
            mortality_tolerance_pct: Some(12.5),
            ..Targets::default()
        };
        assert_eq!(t.mortality_tolerance_pct(), 12.5);
    }

    #[test]
    fn validation_rejects_negative_percentages_and_zero_interval() {
        let t = Targets {
            loss_tolerance_pct: Some(-1.0),
            ..Targets::default()
        };
        assert!(t.validate().is_err());

        let t = Targets {
            inspection_interval_days: Some(0),
            ..Targets::default()
        };
        assert!(t.validate().is_err());

        assert!(Targets::suggested().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let t: Targets = serde_json::from_str(r#"{"loss_tolerance_pct": 7.5}"#).unwrap();
        assert_eq!(t.loss_tolerance_pct, Some(7.5));
        assert_eq!(t.hives_count, None);
    }
}
