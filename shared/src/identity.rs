//! Feature identity resolution.
//!
//! GeoJSON datasets for different administrative levels come from different
//! sources and name their properties differently. Each level gets an ordered
//! list of fields to try; the first present, non-empty value wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::region::{RegionCode, RegionLevel};

pub type PropertyBag = serde_json::Map<String, Value>;

/// How a raw property value is turned into a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeRule {
    /// Use the value as-is.
    Plain(&'static str),
    /// Strip a leading `id` / `ID` (e.g. `"id3507"` -> `"3507"`).
    Prefixed(&'static str),
}

impl CodeRule {
    fn extract(self, properties: &PropertyBag) -> Option<String> {
        match self {
            Self::Plain(key) => property_text(properties, key),
            Self::Prefixed(key) => property_text(properties, key).and_then(|raw| {
                let stripped = raw
                    .strip_prefix("id")
                    .or_else(|| raw.strip_prefix("ID"))
                    .unwrap_or(&raw)
                    .trim()
                    .to_string();
                (!stripped.is_empty()).then_some(stripped)
            }),
        }
    }
}

struct LevelRules {
    codes: &'static [CodeRule],
    names: &'static [&'static str],
    default_name: &'static str,
    navigable: bool,
}

const PROVINCE_RULES: LevelRules = LevelRules {
    codes: &[
        CodeRule::Plain("prov_id"),
        CodeRule::Prefixed("province_code"),
        CodeRule::Plain("bps_code"),
        CodeRule::Plain("ID"),
        CodeRule::Plain("id"),
        CodeRule::Plain("KODE"),
        CodeRule::Plain("kode"),
    ],
    names: &["prov_name", "NAME_1", "PROVINSI", "name"],
    default_name: "Provinsi",
    navigable: true,
};

const REGENCY_RULES: LevelRules = LevelRules {
    codes: &[
        CodeRule::Prefixed("regency_code"),
        CodeRule::Plain("kab_id"),
        CodeRule::Plain("kode_kab"),
        CodeRule::Plain("bps_code"),
    ],
    names: &["name", "NAMOBJ", "NAME_2", "kab_name"],
    default_name: "Kabupaten",
    navigable: true,
};

const DISTRICT_RULES: LevelRules = LevelRules {
    codes: &[
        CodeRule::Prefixed("district_code"),
        CodeRule::Plain("kode_kec"),
        CodeRule::Plain("bps_code"),
    ],
    names: &["district", "NAMOBJ", "name", "WADMKC", "NAME_3"],
    default_name: "Kecamatan",
    navigable: false,
};

/// Rules for the features displayed while `level` is the current view.
fn rules_for(level: RegionLevel) -> &'static LevelRules {
    match level {
        RegionLevel::National => &PROVINCE_RULES,
        RegionLevel::Province => &REGENCY_RULES,
        RegionLevel::Regency | RegionLevel::District => &DISTRICT_RULES,
    }
}

/// Name -> code lookup used when a regency feature carries no code field.
///
/// Keys are normalised upper-case names as produced by [`normalize_region_name`].
pub trait RegencyNameIndex {
    fn code_for_name(&self, normalized_name: &str) -> Option<&str>;
}

impl RegencyNameIndex for HashMap<String, RegionCode> {
    fn code_for_name(&self, normalized_name: &str) -> Option<&str> {
        self.get(normalized_name).map(String::as_str)
    }
}

/// Resolved identity of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionIdentity {
    /// Drill-down target. `None` means the feature is informational only.
    pub code: Option<RegionCode>,
    /// Key into the analytics overlay. Equals `code` for navigable features;
    /// districts keep their code here even though they are not navigable.
    pub data_key: Option<RegionCode>,
    pub name: String,
}

/// Derive the canonical code and display name for a feature shown at `level`.
pub fn resolve_identity(
    properties: &PropertyBag,
    level: RegionLevel,
    names: &impl RegencyNameIndex,
) -> RegionIdentity {
    let rules = rules_for(level);

    let name = rules
        .names
        .iter()
        .find_map(|key| property_text(properties, key))
        .unwrap_or_else(|| rules.default_name.to_string());

    let mut code = rules.codes.iter().find_map(|rule| rule.extract(properties));
    if code.is_none() && level == RegionLevel::Province {
        code = lookup_regency_code(&name, names).map(str::to_string);
    }

    if rules.navigable {
        RegionIdentity {
            data_key: code.clone(),
            code,
            name,
        }
    } else {
        RegionIdentity {
            code: None,
            data_key: code,
            name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminPrefix {
    Kabupaten,
    Kota,
    None,
}

const KABUPATEN_PREFIXES: &[&str] = &["KABUPATEN ", "KAB. ", "KAB "];
const KOTA_PREFIX: &str = "KOTA ";

/// Upper-case and collapse internal whitespace.
pub fn normalize_region_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_admin_prefix(normalized: &str) -> (AdminPrefix, &str) {
    if let Some(rest) = normalized.strip_prefix(KOTA_PREFIX) {
        return (AdminPrefix::Kota, rest.trim());
    }
    for prefix in KABUPATEN_PREFIXES {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            return (AdminPrefix::Kabupaten, rest.trim());
        }
    }
    (AdminPrefix::None, normalized)
}

/// Lookup keys to try for a regency name, most specific first.
///
/// City tables are keyed `KOTA X` while regencies are keyed by the bare name,
/// so a `KOTA` source prefers the city key and everything else prefers the
/// bare key, each falling back to the other form.
pub fn regency_name_candidates(raw: &str) -> Vec<String> {
    let normalized = normalize_region_name(raw);
    if normalized.is_empty() {
        return Vec::new();
    }

    let (prefix, bare) = split_admin_prefix(&normalized);
    let city = format!("{KOTA_PREFIX}{bare}");
    let ordered = match prefix {
        AdminPrefix::Kota => [normalized.clone(), city, bare.to_string()],
        AdminPrefix::Kabupaten | AdminPrefix::None => {
            [normalized.clone(), bare.to_string(), city]
        }
    };

    let mut candidates: Vec<String> = Vec::with_capacity(ordered.len());
    for candidate in ordered {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

pub fn lookup_regency_code<'a>(
    raw_name: &str,
    names: &'a impl RegencyNameIndex,
) -> Option<&'a str> {
    regency_name_candidates(raw_name)
        .iter()
        .find_map(|candidate| names.code_for_name(candidate))
}

/// Read a property as trimmed text. Numbers are stringified; empty strings,
/// nulls, booleans and nested values count as absent.
fn property_text(properties: &PropertyBag, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

/// Whole floats such as `35.0` print as integers so they still read as codes.
fn number_text(n: &serde_json::Number) -> String {
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    match n.as_f64() {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 => format!("{v:.0}"),
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> PropertyBag {
        match value {
            Value::Object(map) => map,
            _ => panic!("test properties must be an object"),
        }
    }

    fn names() -> HashMap<String, RegionCode> {
        HashMap::from([
            ("SLEMAN".to_string(), "3404".to_string()),
            ("MALANG".to_string(), "3507".to_string()),
            ("KOTA MALANG".to_string(), "3573".to_string()),
            ("KOTA YOGYAKARTA".to_string(), "3471".to_string()),
        ])
    }

    #[test]
    fn province_feature_uses_first_matching_fields() {
        let props = bag(json!({"prov_id": 35, "id": "99", "prov_name": "Jawa Timur"}));
        let identity = resolve_identity(&props, RegionLevel::National, &names());
        assert_eq!(identity.code.as_deref(), Some("35"));
        assert_eq!(identity.data_key.as_deref(), Some("35"));
        assert_eq!(identity.name, "Jawa Timur");
    }

    #[test]
    fn whole_float_codes_read_as_integers() {
        let props = bag(json!({"prov_id": 35.0, "prov_name": "Jawa Timur"}));
        let identity = resolve_identity(&props, RegionLevel::National, &names());
        assert_eq!(identity.code.as_deref(), Some("35"));
        assert_eq!(RegionLevel::from_code("35"), Some(RegionLevel::Province));

        let props = bag(json!({"regency_code": 3507.0, "name": "Malang"}));
        let identity = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(identity.code.as_deref(), Some("3507"));

        let props = bag(json!({"prov_id": 35.5}));
        let identity = resolve_identity(&props, RegionLevel::National, &names());
        assert_eq!(identity.data_key.as_deref(), Some("35.5"));
    }

    #[test]
    fn province_feature_falls_back_to_generic_id() {
        let props = bag(json!({"id": "34", "NAME_1": "DI Yogyakarta"}));
        let identity = resolve_identity(&props, RegionLevel::National, &names());
        assert_eq!(identity.code.as_deref(), Some("34"));
        assert_eq!(identity.name, "DI Yogyakarta");
    }

    #[test]
    fn feature_without_any_identifier_is_not_navigable() {
        let props = bag(json!({"prov_id": "", "colour": "red"}));
        let identity = resolve_identity(&props, RegionLevel::National, &names());
        assert_eq!(identity.code, None);
        assert_eq!(identity.name, "Provinsi");
    }

    #[test]
    fn regency_code_strips_id_prefix() {
        let props = bag(json!({"regency_code": "id3507", "name": "Malang"}));
        let identity = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(identity.code.as_deref(), Some("3507"));
    }

    #[test]
    fn regency_resolves_by_name_when_code_is_absent() {
        let props = bag(json!({"name": "KABUPATEN SLEMAN"}));
        let identity = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(identity.code.as_deref(), Some("3404"));
        assert_eq!(identity.name, "KABUPATEN SLEMAN");
    }

    #[test]
    fn city_prefix_prefers_city_entry() {
        let props = bag(json!({"NAMOBJ": "Kota  Malang"}));
        let identity = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(identity.code.as_deref(), Some("3573"));
    }

    #[test]
    fn bare_city_name_tries_alternate_prefix() {
        let props = bag(json!({"name": "Yogyakarta"}));
        let identity = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(identity.code.as_deref(), Some("3471"));
    }

    #[test]
    fn unknown_regency_name_is_not_navigable() {
        let props = bag(json!({"name": "KABUPATEN ATLANTIS"}));
        let identity = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(identity.code, None);
        assert_eq!(identity.data_key, None);
    }

    #[test]
    fn districts_keep_data_key_but_never_navigate() {
        let props = bag(json!({"district_code": "id350701", "district": "Donomulyo"}));
        let identity = resolve_identity(&props, RegionLevel::Regency, &names());
        assert_eq!(identity.code, None);
        assert_eq!(identity.data_key.as_deref(), Some("350701"));
        assert_eq!(identity.name, "Donomulyo");
    }

    #[test]
    fn resolution_is_deterministic() {
        let props = bag(json!({"name": "Kab. Sleman", "NAMOBJ": "Sleman"}));
        let first = resolve_identity(&props, RegionLevel::Province, &names());
        let second = resolve_identity(&props, RegionLevel::Province, &names());
        assert_eq!(first, second);
    }

    #[test]
    fn candidates_are_deduplicated_and_ordered() {
        assert_eq!(
            regency_name_candidates("kabupaten sleman"),
            vec!["KABUPATEN SLEMAN", "SLEMAN", "KOTA SLEMAN"]
        );
        assert_eq!(
            regency_name_candidates("Kota Malang"),
            vec!["KOTA MALANG", "MALANG"]
        );
        assert_eq!(regency_name_candidates("Sleman"), vec!["SLEMAN", "KOTA SLEMAN"]);
        assert!(regency_name_candidates("   ").is_empty());
    }
}
