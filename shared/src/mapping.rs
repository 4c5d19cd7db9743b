use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::{RegencyNameIndex, lookup_regency_code};
use crate::loader::LoadError;
use crate::region::{RegionCode, RegionLevel, RegionRef};

/// Region code -> dataset reference data.
///
/// Provinces all point at the shared `kabupaten` file; regencies point at
/// their own district file. Served by the server as JSON so the client never
/// embeds the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMapping {
    pub national_dataset: String,
    #[serde(default)]
    pub datasets: HashMap<RegionCode, String>,
    /// Normalised regency/city name -> four digit code.
    #[serde(default)]
    pub regency_names: HashMap<String, RegionCode>,
}

/// Which file to fetch for a view, and how to narrow it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    pub file: String,
    /// Keep only features whose province property equals this code.
    pub province_filter: Option<RegionCode>,
}

impl DatasetRef {
    /// URL path of the dataset relative to the map asset root.
    pub fn path(&self) -> String {
        format!("/maps/{}.geojson", self.file)
    }
}

impl RegionMapping {
    pub fn dataset_for(&self, region: &RegionRef) -> Result<DatasetRef, LoadError> {
        if region.is_root() {
            return Ok(DatasetRef {
                file: self.national_dataset.clone(),
                province_filter: None,
            });
        }

        let file = self
            .datasets
            .get(&region.code)
            .filter(|file| !file.is_empty())
            .ok_or_else(|| LoadError::NotFound {
                code: region.code.clone(),
            })?;

        let province_filter =
            (region.level == RegionLevel::Province).then(|| region.code.clone());

        Ok(DatasetRef {
            file: file.clone(),
            province_filter,
        })
    }

    /// Whether a detailed dataset exists for `code`.
    pub fn has_dataset(&self, code: &str) -> bool {
        self.datasets.get(code).is_some_and(|file| !file.is_empty())
    }

    pub fn regency_code_for_name(&self, name: &str) -> Option<&str> {
        lookup_regency_code(name, &self.regency_names)
    }
}

impl RegencyNameIndex for RegionMapping {
    fn code_for_name(&self, normalized_name: &str) -> Option<&str> {
        self.regency_names.get(normalized_name).map(String::as_str)
    }
}
