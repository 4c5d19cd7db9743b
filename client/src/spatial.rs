use std::sync::Arc;

use pukpuk_shared::{
    BoundingRegion, GeoFeature, GeoFeatureSet, RegencyNameIndex, RegionIdentity, RegionLevel,
    resolve_identity,
};

const GRID_COLS: usize = 32;
const GRID_ROWS: usize = 32;

/// Hit-test index over one committed dataset.
///
/// Identities are resolved once per load so hover and click never touch the
/// property bags again. Candidate lookup goes through a coarse grid of
/// feature bounding boxes; the exact test is the even-odd polygon check.
pub struct FeatureIndex {
    features: Arc<GeoFeatureSet>,
    identities: Vec<RegionIdentity>,
    cells: Vec<Vec<usize>>,
    bounds: Option<BoundingRegion>,
    cell_w: f64,
    cell_h: f64,
}

impl FeatureIndex {
    pub fn empty() -> Self {
        Self {
            features: Arc::new(GeoFeatureSet::default()),
            identities: Vec::new(),
            cells: Vec::new(),
            bounds: None,
            cell_w: 1.0,
            cell_h: 1.0,
        }
    }

    /// `level` is the level whose dataset is displayed, which decides how
    /// feature properties are read.
    pub fn build(
        features: Arc<GeoFeatureSet>,
        level: RegionLevel,
        names: &impl RegencyNameIndex,
    ) -> Self {
        let identities = features
            .features
            .iter()
            .map(|feature| resolve_identity(&feature.properties, level, names))
            .collect();

        let Some(bounds) = features.bounds().filter(|b| b.width() > 0.0 && b.height() > 0.0)
        else {
            return Self {
                features,
                identities,
                ..Self::empty()
            };
        };

        let cell_w = bounds.width() / GRID_COLS as f64;
        let cell_h = bounds.height() / GRID_ROWS as f64;
        let mut cells = vec![Vec::new(); GRID_COLS * GRID_ROWS];

        for (idx, feature) in features.features.iter().enumerate() {
            let Some(fb) = feature.bounds else {
                continue;
            };
            let (col_start, row_start) = cell_of(&bounds, cell_w, cell_h, fb.min_lon, fb.min_lat);
            let (col_end, row_end) = cell_of(&bounds, cell_w, cell_h, fb.max_lon, fb.max_lat);
            for row in row_start..=row_end {
                for col in col_start..=col_end {
                    cells[row * GRID_COLS + col].push(idx);
                }
            }
        }

        Self {
            features,
            identities,
            cells,
            bounds: Some(bounds),
            cell_w,
            cell_h,
        }
    }

    pub fn feature(&self, idx: usize) -> Option<&GeoFeature> {
        self.features.features.get(idx)
    }

    pub fn identity(&self, idx: usize) -> Option<&RegionIdentity> {
        self.identities.get(idx)
    }

    /// Draw order: feature and identity side by side.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &GeoFeature, &RegionIdentity)> {
        self.features
            .features
            .iter()
            .zip(&self.identities)
            .enumerate()
            .map(|(idx, (feature, identity))| (idx, feature, identity))
    }

    /// Topmost feature under a point, i.e. the one drawn last.
    pub fn find_at(&self, lon: f64, lat: f64) -> Option<usize> {
        let bounds = self.bounds.as_ref()?;
        if !bounds.contains(lon, lat) {
            return None;
        }
        let (col, row) = cell_of(bounds, self.cell_w, self.cell_h, lon, lat);
        self.cells[row * GRID_COLS + col]
            .iter()
            .rev()
            .copied()
            .find(|&idx| {
                self.features
                    .features
                    .get(idx)
                    .is_some_and(|feature| feature.contains(lon, lat))
            })
    }
}

/// Grid cell for a point, clamped to the grid so boundary points stay inside.
fn cell_of(bounds: &BoundingRegion, cell_w: f64, cell_h: f64, lon: f64, lat: f64) -> (usize, usize) {
    let col = ((lon - bounds.min_lon) / cell_w).floor().clamp(0.0, (GRID_COLS - 1) as f64);
    let row = ((lat - bounds.min_lat) / cell_h).floor().clamp(0.0, (GRID_ROWS - 1) as f64);
    (col as usize, row as usize)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn square(props: serde_json::Value, x0: f64, y0: f64, size: f64) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": props,
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]
                ]]
            }
        })
    }

    fn regencies() -> Arc<GeoFeatureSet> {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [
                square(json!({"regency_code": "3404", "name": "Sleman"}), 110.2, -7.8, 0.4),
                square(json!({"name": "KOTA YOGYAKARTA"}), 110.3, -7.8, 0.1),
                square(json!({"regency_code": "3402", "name": "Bantul"}), 110.2, -8.2, 0.4),
            ]
        })
        .to_string();
        Arc::new(GeoFeatureSet::parse(&raw, None).expect("valid collection"))
    }

    fn names() -> HashMap<String, String> {
        HashMap::from([("KOTA YOGYAKARTA".to_string(), "3471".to_string())])
    }

    #[test]
    fn identities_are_resolved_once_per_feature() {
        let index = FeatureIndex::build(regencies(), RegionLevel::Province, &names());
        assert_eq!(index.iter().count(), 3);
        assert_eq!(
            index.identity(1).and_then(|id| id.code.as_deref()),
            Some("3471")
        );
        assert_eq!(
            index.identity(2).map(|id| id.name.as_str()),
            Some("Bantul")
        );
    }

    #[test]
    fn topmost_feature_wins() {
        let index = FeatureIndex::build(regencies(), RegionLevel::Province, &names());
        // Inside both Sleman and the city drawn on top of it.
        assert_eq!(index.find_at(110.35, -7.75), Some(1));
        assert_eq!(index.find_at(110.5, -7.6), Some(0));
        assert_eq!(index.find_at(110.4, -8.0), Some(2));
    }

    #[test]
    fn misses_outside_any_polygon() {
        let index = FeatureIndex::build(regencies(), RegionLevel::Province, &names());
        assert_eq!(index.find_at(100.0, -7.7), None);
        assert_eq!(index.find_at(110.1, -7.7), None);
    }

    #[test]
    fn empty_index_never_hits() {
        let index = FeatureIndex::empty();
        assert_eq!(index.iter().count(), 0);
        assert_eq!(index.find_at(110.4, -7.7), None);
        assert!(index.iter().next().is_none());
    }
}
