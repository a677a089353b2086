use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrimon_core::{AssetId, DomainError, DomainResult};

/// What kind of activity an asset belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Cultivated block (banana, taro, PIF...) carrying a 7-in-1 soil probe.
    CultivatedBlock,
    Hive,
    RabbitUnit,
    NurseryLot,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::CultivatedBlock,
        ActivityKind::Hive,
        ActivityKind::RabbitUnit,
        ActivityKind::NurseryLot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::CultivatedBlock => "cultivated_block",
            ActivityKind::Hive => "hive",
            ActivityKind::RabbitUnit => "rabbit_unit",
            ActivityKind::NurseryLot => "nursery_lot",
        }
    }
}

impl core::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored real-world unit.
///
/// Registered once by the asset-management collaborator and immutable from the
/// engine's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredAsset {
    pub id: AssetId,
    pub kind: ActivityKind,
    pub name: String,
    /// Activity-specific category (crop name, nursery species). Selects the
    /// threshold profile.
    pub category: Option<String>,
    pub location: Option<String>,
    pub area_m2: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl MonitoredAsset {
    pub fn new(
        id: AssetId,
        kind: ActivityKind,
        name: impl Into<String>,
        category: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("asset name cannot be empty"));
        }
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            id,
            kind,
            name: name.to_string(),
            category,
            location: None,
            area_m2: None,
            created_at,
        })
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = Some(location.trim().to_string()).filter(|l| !l.is_empty());
        self
    }

    pub fn with_area_m2(mut self, area_m2: f64) -> Self {
        self.area_m2 = Some(area_m2).filter(|a| a.is_finite() && *a > 0.0);
        self
    }
}
