use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::insights::ViewMode;
use crate::region::RegionCode;

/// Severity category reported by the analytics service for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayStatus {
    Critical,
    Warning,
    Safe,
    Overstock,
    #[default]
    #[serde(other)]
    Unknown,
}

impl OverlayStatus {
    pub const fn color(self) -> &'static str {
        match self {
            Self::Critical => "#EF4444",
            Self::Warning => "#F59E0B",
            Self::Safe => "#10B981",
            Self::Overstock => "#8B5CF6",
            Self::Unknown => NEUTRAL_FILL,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Safe => "safe",
            Self::Overstock => "overstock",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayEntry {
    #[serde(default)]
    pub status: OverlayStatus,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
}

pub type AnalyticsOverlayMap = HashMap<RegionCode, OverlayEntry>;

pub const NEUTRAL_FILL: &str = "#E2E8F0";
/// Muted fills for regions the analytics service has nothing on.
pub const PLACEHOLDER_FILLS: [&str; 2] = ["#FFEDA0", "#FFF7BC"];

const STROKE: &str = "white";
const HOVER_STROKE: &str = "#666";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderStyle {
    pub fill: &'static str,
    pub fill_opacity: f64,
    pub stroke: &'static str,
    pub weight: f64,
    /// Dash length for the outline, `None` for solid.
    pub dash: Option<f64>,
    /// True when no analytics entry backed this style.
    pub placeholder: bool,
}

impl RenderStyle {
    /// Outline emphasis while the pointer is over a feature.
    pub fn highlighted(&self) -> Self {
        Self {
            stroke: HOVER_STROKE,
            weight: 3.0,
            dash: None,
            fill_opacity: 0.7,
            ..self.clone()
        }
    }
}

fn base_style(fill: &'static str, placeholder: bool) -> RenderStyle {
    RenderStyle {
        fill,
        fill_opacity: 0.7,
        stroke: STROKE,
        weight: 1.0,
        dash: Some(3.0),
        placeholder,
    }
}

/// Stable placeholder fill for a key.
pub fn placeholder_fill(key: &str) -> &'static str {
    let hash = crc32fast::hash(key.as_bytes());
    PLACEHOLDER_FILLS[(hash as usize) % PLACEHOLDER_FILLS.len()]
}

/// Style for one feature.
///
/// Looks `key` up in the overlay. Without an entry the fill is a placeholder
/// chosen from `key`, or from `fallback_key` when the feature has no code.
pub fn style_for(
    key: Option<&str>,
    fallback_key: &str,
    overlay: Option<&AnalyticsOverlayMap>,
) -> RenderStyle {
    match lookup(key, overlay) {
        Some(entry) => base_style(entry.status.color(), false),
        None => base_style(placeholder_fill(key.unwrap_or(fallback_key)), true),
    }
}

/// Tooltip/popup content for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayContent {
    pub title: String,
    /// e.g. `"12,345 Ton"`.
    pub value_text: Option<String>,
    pub status_label: Option<String>,
}

pub fn content_for(
    name: &str,
    key: Option<&str>,
    overlay: Option<&AnalyticsOverlayMap>,
) -> DisplayContent {
    let entry = lookup(key, overlay);
    DisplayContent {
        title: name.to_string(),
        value_text: entry
            .and_then(|e| e.value)
            .filter(|v| v.is_finite())
            .map(|v| format!("{} Ton", format_grouped(v))),
        status_label: entry
            .and_then(|e| e.label.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
    }
}

fn lookup<'a>(
    key: Option<&str>,
    overlay: Option<&'a AnalyticsOverlayMap>,
) -> Option<&'a OverlayEntry> {
    overlay?.get(key?)
}

/// Format with thousands separators and at most three decimals.
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    // Scaling beyond this magnitude would overflow; such values have no fraction left anyway.
    let rounded = if value.abs() < 1e15 {
        (value * 1000.0).round() / 1000.0
    } else {
        value
    };
    let negative = rounded < 0.0;
    let text = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((&text, ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 5);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub status: OverlayStatus,
    pub label: &'static str,
}

pub const LEGEND: [LegendEntry; 4] = [
    LegendEntry {
        status: OverlayStatus::Critical,
        label: "Critical (Defisit)",
    },
    LegendEntry {
        status: OverlayStatus::Warning,
        label: "Warning (Menipis)",
    },
    LegendEntry {
        status: OverlayStatus::Safe,
        label: "Safe (Aman)",
    },
    LegendEntry {
        status: OverlayStatus::Overstock,
        label: "Overstock (Dead Stock)",
    },
];

pub const fn legend_title(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Forecast => "Risk Index (AI Prediction)",
        ViewMode::Live => "Real-time Stock Level",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> AnalyticsOverlayMap {
        let mut map = AnalyticsOverlayMap::new();
        map.insert(
            "35".to_string(),
            OverlayEntry {
                status: OverlayStatus::Critical,
                value: Some(12345.5),
                label: Some("Defisit".to_string()),
            },
        );
        map.insert(
            "34".to_string(),
            OverlayEntry {
                status: OverlayStatus::Unknown,
                value: None,
                label: None,
            },
        );
        map
    }

    #[test]
    fn entry_selects_severity_colour() {
        let style = style_for(Some("35"), "Jawa Timur", Some(&overlay()));
        assert_eq!(style.fill, "#EF4444");
        assert!(!style.placeholder);
        assert_eq!(style.stroke, "white");
        assert_eq!(style.dash, Some(3.0));
    }

    #[test]
    fn unknown_status_renders_neutral() {
        let style = style_for(Some("34"), "DIY", Some(&overlay()));
        assert_eq!(style.fill, NEUTRAL_FILL);
        assert!(!style.placeholder);
    }

    #[test]
    fn missing_entry_falls_back_to_stable_placeholder() {
        let a = style_for(Some("3507"), "Malang", Some(&overlay()));
        let b = style_for(Some("3507"), "Other", None);
        assert!(a.placeholder);
        assert!(PLACEHOLDER_FILLS.contains(&a.fill));
        assert_eq!(a.fill, b.fill);
        assert_eq!(a, style_for(Some("3507"), "Malang", Some(&overlay())));
    }

    #[test]
    fn codeless_feature_uses_fallback_key() {
        let style = style_for(None, "Kecamatan", Some(&overlay()));
        assert!(style.placeholder);
        assert_eq!(style.fill, placeholder_fill("Kecamatan"));
    }

    #[test]
    fn content_includes_value_and_status_when_present() {
        let content = content_for("Jawa Timur", Some("35"), Some(&overlay()));
        assert_eq!(content.title, "Jawa Timur");
        assert_eq!(content.value_text.as_deref(), Some("12,345.5 Ton"));
        assert_eq!(content.status_label.as_deref(), Some("Defisit"));
    }

    #[test]
    fn content_omits_missing_fields() {
        let content = content_for("DIY", Some("34"), Some(&overlay()));
        assert_eq!(content.value_text, None);
        assert_eq!(content.status_label, None);

        let empty = content_for("Malang", None, None);
        assert_eq!(empty.title, "Malang");
        assert_eq!(empty.value_text, None);
    }

    #[test]
    fn unrecognised_wire_status_decodes_as_unknown() {
        let entry: OverlayEntry =
            serde_json::from_str(r#"{"status":"surplus","value":10}"#).unwrap();
        assert_eq!(entry.status, OverlayStatus::Unknown);
        assert_eq!(entry.value, Some(10.0));

        let entry: OverlayEntry = serde_json::from_str(r#"{"status":"overstock"}"#).unwrap();
        assert_eq!(entry.status, OverlayStatus::Overstock);
    }

    #[test]
    fn grouping_matches_locale_style() {
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1000.0), "1,000");
        assert_eq!(format_grouped(1234567.891), "1,234,567.891");
        assert_eq!(format_grouped(12.30001), "12.3");
        assert_eq!(format_grouped(-4500.25), "-4,500.25");
        assert_eq!(format_grouped(2e15), "2,000,000,000,000,000");
        let huge = format_grouped(1e306);
        assert!(huge.starts_with("1,000,"));
        assert!(!huge.contains("inf"));
    }

    #[test]
    fn highlight_drops_dash_and_thickens_outline() {
        let style = style_for(Some("35"), "x", Some(&overlay())).highlighted();
        assert_eq!(style.weight, 3.0);
        assert_eq!(style.dash, None);
        assert_eq!(style.stroke, "#666");
        assert_eq!(style.fill, "#EF4444");
    }
}
