use geojson::{GeoJson, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::identity::PropertyBag;
use crate::loader::LoadError;

/// Properties that name the owning province on the shared regency file.
const PROVINCE_FILTER_KEYS: &[&str] = &["prov_id", "province_code"];

/// A closed ring of `[lon, lat]` points.
pub type Ring = Vec<[f64; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingRegion {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    fn include(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    fn from_point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }
}

/// One polygonal feature. Holes and multipolygon parts are all flattened into
/// `rings`; hit testing uses the even-odd rule so holes stay holes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub properties: PropertyBag,
    pub rings: Vec<Ring>,
    pub bounds: Option<BoundingRegion>,
}

impl GeoFeature {
    /// Rings with fewer than three points are dropped.
    pub fn new(properties: PropertyBag, mut rings: Vec<Ring>) -> Self {
        rings.retain(|ring| ring.len() >= 3);
        let bounds = bounds_of(rings.iter().flatten());
        Self {
            properties,
            rings,
            bounds,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if !self.bounds.is_some_and(|b| b.contains(lon, lat)) {
            return false;
        }
        let crossings = self
            .rings
            .iter()
            .filter(|ring| ring_contains(ring, lon, lat))
            .count();
        crossings % 2 == 1
    }
}

/// Parsed dataset for one view. Replaced wholesale on every committed load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoFeatureSet {
    pub features: Vec<GeoFeature>,
}

impl GeoFeatureSet {
    /// Parse a GeoJSON document, optionally keeping only features that belong
    /// to `province_filter`.
    pub fn parse(raw: &str, province_filter: Option<&str>) -> Result<Self, LoadError> {
        let geojson: GeoJson = raw
            .parse()
            .map_err(|e: geojson::Error| LoadError::Parse(e.to_string()))?;

        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(LoadError::Parse(
                    "expected a Feature or FeatureCollection".to_string(),
                ));
            }
        };

        let features = features
            .into_iter()
            .map(|feature| {
                let properties = feature.properties.unwrap_or_default();
                let mut rings = Vec::new();
                if let Some(geometry) = &feature.geometry {
                    collect_rings(geometry, &mut rings);
                }
                GeoFeature::new(properties, rings)
            })
            .filter(|feature| match province_filter {
                Some(code) => belongs_to_province(&feature.properties, code),
                None => true,
            })
            .collect();

        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Geographic extent of every feature, `None` when nothing has geometry.
    pub fn bounds(&self) -> Option<BoundingRegion> {
        self.features
            .iter()
            .filter_map(|f| f.bounds)
            .reduce(|mut acc, b| {
                acc.include(b.min_lon, b.min_lat);
                acc.include(b.max_lon, b.max_lat);
                acc
            })
    }

    /// Index of the topmost feature under a point (last drawn wins).
    pub fn feature_at(&self, lon: f64, lat: f64) -> Option<usize> {
        self.features
            .iter()
            .rposition(|feature| feature.contains(lon, lat))
    }
}

fn belongs_to_province(properties: &PropertyBag, code: &str) -> bool {
    PROVINCE_FILTER_KEYS.iter().any(|key| {
        match properties.get(*key) {
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                s == code || s.strip_prefix("id").is_some_and(|rest| rest == code)
            }
            Some(serde_json::Value::Number(n)) => n.to_string() == code,
            _ => false,
        }
    })
}

fn collect_rings(geometry: &Geometry, out: &mut Vec<Ring>) {
    match &geometry.value {
        Value::Polygon(polygon) => push_polygon(polygon, out),
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                push_polygon(polygon, out);
            }
        }
        Value::GeometryCollection(geometries) => {
            for inner in geometries {
                collect_rings(inner, out);
            }
        }
        // Points and lines have no area to fill or hit.
        _ => {}
    }
}

fn push_polygon(polygon: &[Vec<Vec<f64>>], out: &mut Vec<Ring>) {
    for ring in polygon {
        let points: Ring = ring
            .iter()
            .filter_map(|pos| match pos.as_slice() {
                [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some([*lon, *lat]),
                _ => None,
            })
            .collect();
        if points.len() >= 3 {
            out.push(points);
        }
    }
}

fn bounds_of<'a>(points: impl Iterator<Item = &'a [f64; 2]>) -> Option<BoundingRegion> {
    let mut bounds: Option<BoundingRegion> = None;
    for &[lon, lat] in points {
        match bounds.as_mut() {
            Some(b) => b.include(lon, lat),
            None => bounds = Some(BoundingRegion::from_point(lon, lat)),
        }
    }
    bounds
}

/// Ray casting test for a single ring.
fn ring_contains(ring: &[[f64; 2]], lon: f64, lat: f64) -> bool {
    let Some(mut j) = ring.len().checked_sub(1) else {
        return false;
    };
    let mut inside = false;
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
