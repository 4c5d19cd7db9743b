//! Analytics overlay API types: the heatmap query and its response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::overlay::AnalyticsOverlayMap;
use crate::region::RegionCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Live,
    #[default]
    Forecast,
}

impl ViewMode {
    pub const ALL: [Self; 2] = [Self::Live, Self::Forecast];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Forecast => "forecast",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Live => "Live",
            Self::Forecast => "Forecast (AI)",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataLayer {
    #[default]
    Demand,
    Stock,
    Shortage,
    DeadStock,
}

impl DataLayer {
    pub const ALL: [Self; 4] = [Self::Demand, Self::Stock, Self::Shortage, Self::DeadStock];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Demand => "demand",
            Self::Stock => "stock",
            Self::Shortage => "shortage",
            Self::DeadStock => "dead-stock",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Demand => "Forecast (AI)",
            Self::Stock => "Live Stock",
            Self::Shortage => "Shortage Risk",
            Self::DeadStock => "Dead-Stock Intensity",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    #[serde(other)]
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Medium,
    High,
    #[default]
    #[serde(other)]
    Low,
}

impl Risk {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalInsight {
    pub name: String,
    #[serde(default)]
    pub code: Option<RegionCode>,
    #[serde(default)]
    pub demand: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub risk: Risk,
}

impl RegionalInsight {
    /// Card title: the name without its regency/city prefix.
    pub fn display_name(&self) -> String {
        let upper = self.name.trim().to_uppercase();
        let name = upper.strip_prefix("KABUPATEN ").unwrap_or(&upper);
        let name = name.strip_prefix("KOTA ").unwrap_or(name);
        name.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapResponse {
    #[serde(default)]
    pub map_analytics: AnalyticsOverlayMap,
    #[serde(default)]
    pub regional_insights: Vec<RegionalInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Parameters of one overlay request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeatmapQuery {
    pub level: RegionCode,
    pub mode: ViewMode,
    pub layer: DataLayer,
}

impl HeatmapQuery {
    /// Stable cache key for this request.
    pub fn cache_key(&self) -> String {
        format!("{}|{}|{}", self.level, self.mode.as_str(), self.layer.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayStatus;

    #[test]
    fn decodes_service_payload() {
        let json = r#"{
            "mapAnalytics": {
                "35": {"status": "critical", "value": 1200.5, "label": "Defisit"},
                "34": {"status": "safe"}
            },
            "regionalInsights": [
                {"name": "KABUPATEN MALANG", "code": "3507", "demand": "1.2K Ton",
                 "confidence": 87, "trend": "up", "risk": "high"},
                {"name": "Kota Batu", "demand": "300 Ton", "confidence": 70.5,
                 "trend": "sideways", "risk": "medium"}
            ],
            "generatedAt": "2026-03-01T08:00:00Z"
        }"#;
        let response: HeatmapResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.map_analytics.len(), 2);
        assert_eq!(response.map_analytics["35"].status, OverlayStatus::Critical);
        assert_eq!(response.regional_insights[0].risk, Risk::High);
        assert_eq!(response.regional_insights[1].trend, Trend::Stable);
        assert_eq!(response.regional_insights[1].code, None);
        assert!(response.generated_at.is_some());
    }

    #[test]
    fn unknown_risk_and_trend_fall_back_to_defaults() {
        let json = r#"{"name": "Jawa Timur", "trend": "sideways", "risk": "severe"}"#;
        let insight: RegionalInsight = serde_json::from_str(json).unwrap();
        assert_eq!(insight.risk, Risk::Low);
        assert_eq!(insight.trend, Trend::Stable);

        let json = r#"{"name": "Jawa Timur", "risk": "high"}"#;
        let insight: RegionalInsight = serde_json::from_str(json).unwrap();
        assert_eq!(insight.risk, Risk::High);
        assert_eq!(insight.trend, Trend::Stable);
    }

    #[test]
    fn empty_payload_defaults() {
        let response: HeatmapResponse = serde_json::from_str("{}").unwrap();
        assert!(response.map_analytics.is_empty());
        assert!(response.regional_insights.is_empty());
    }

    #[test]
    fn display_name_strips_admin_prefix() {
        let insight = RegionalInsight {
            name: "KABUPATEN MALANG".to_string(),
            code: Some("3507".to_string()),
            demand: String::new(),
            confidence: 0.0,
            trend: Trend::Up,
            risk: Risk::Low,
        };
        assert_eq!(insight.display_name(), "MALANG");

        let city = RegionalInsight {
            name: "KOTA MALANG".to_string(),
            ..insight.clone()
        };
        assert_eq!(city.display_name(), "MALANG");

        let mixed_case = RegionalInsight {
            name: "Kota Batu".to_string(),
            ..insight.clone()
        };
        assert_eq!(mixed_case.display_name(), "BATU");

        let plain = RegionalInsight {
            name: "Jawa Timur".to_string(),
            ..insight
        };
        assert_eq!(plain.display_name(), "JAWA TIMUR");
    }

    #[test]
    fn cache_key_joins_level_mode_and_layer() {
        let query = HeatmapQuery {
            level: "35".to_string(),
            mode: ViewMode::Forecast,
            layer: DataLayer::DeadStock,
        };
        assert_eq!(query.cache_key(), "35|forecast|dead-stock");
    }

    #[test]
    fn mode_and_layer_parse_their_wire_names() {
        assert_eq!(ViewMode::parse("live"), Some(ViewMode::Live));
        assert_eq!(ViewMode::parse("LIVE"), None);
        assert_eq!(DataLayer::parse("dead-stock"), Some(DataLayer::DeadStock));
        assert_eq!(DataLayer::parse("heat"), None);
        assert_eq!(ViewMode::default(), ViewMode::Forecast);
        assert_eq!(DataLayer::default(), DataLayer::Demand);
    }
}
