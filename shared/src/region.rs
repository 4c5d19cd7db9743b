use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the national (root) view. Never a numeric code.
pub const ROOT_CODE: &str = "pulau";
/// Legacy alias some callers still send for the root view.
pub const ROOT_CODE_ALIAS: &str = "indonesia";
pub const ROOT_LABEL: &str = "Indonesia";

pub type RegionCode = String;

/// Position in the administrative hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    National,
    Province,
    Regency,
    District,
}

impl RegionLevel {
    /// Infer the level a code belongs to from its shape.
    ///
    /// 2 digits = province, 4 = regency/city, 6 or 7 = district. The root
    /// sentinel maps to `National`. Anything else is unrecognised.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        if is_root_code(code) {
            return Some(Self::National);
        }
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match code.len() {
            2 => Some(Self::Province),
            4 => Some(Self::Regency),
            6 | 7 => Some(Self::District),
            _ => None,
        }
    }

    /// The level one step deeper, or `None` at the terminal level.
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::National => Some(Self::Province),
            Self::Province => Some(Self::Regency),
            Self::Regency => Some(Self::District),
            Self::District => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.child().is_none()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::National => "national",
            Self::Province => "province",
            Self::Regency => "regency",
            Self::District => "district",
        }
    }

    /// Human label for the features shown while this level is displayed.
    pub const fn feature_kind(self) -> &'static str {
        match self {
            Self::National => "Provinsi",
            Self::Province => "Kabupaten/Kota",
            Self::Regency | Self::District => "Kecamatan",
        }
    }
}

impl fmt::Display for RegionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_root_code(code: &str) -> bool {
    code == ROOT_CODE || code == ROOT_CODE_ALIAS
}

/// A `(level, code)` pair naming one displayable view.
///
/// Emitted by the navigator on every level change; the dataset loader and the
/// overlay fetch key off it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionRef {
    pub level: RegionLevel,
    pub code: RegionCode,
}

impl RegionRef {
    pub fn root() -> Self {
        Self {
            level: RegionLevel::National,
            code: ROOT_CODE.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.level == RegionLevel::National
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_shape_implies_level() {
        assert_eq!(RegionLevel::from_code("pulau"), Some(RegionLevel::National));
        assert_eq!(
            RegionLevel::from_code("indonesia"),
            Some(RegionLevel::National)
        );
        assert_eq!(RegionLevel::from_code("35"), Some(RegionLevel::Province));
        assert_eq!(RegionLevel::from_code("3507"), Some(RegionLevel::Regency));
        assert_eq!(RegionLevel::from_code("350701"), Some(RegionLevel::District));
        assert_eq!(
            RegionLevel::from_code("3507010"),
            Some(RegionLevel::District)
        );
    }

    #[test]
    fn unrecognised_codes_have_no_level() {
        assert_eq!(RegionLevel::from_code(""), None);
        assert_eq!(RegionLevel::from_code("3"), None);
        assert_eq!(RegionLevel::from_code("350"), None);
        assert_eq!(RegionLevel::from_code("SLEMAN"), None);
        assert_eq!(RegionLevel::from_code("id3507"), None);
    }

    #[test]
    fn district_is_the_only_terminal_level() {
        assert!(!RegionLevel::National.is_terminal());
        assert!(!RegionLevel::Province.is_terminal());
        assert!(!RegionLevel::Regency.is_terminal());
        assert!(RegionLevel::District.is_terminal());
        assert_eq!(RegionLevel::Regency.child(), Some(RegionLevel::District));
    }
}
