use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pukpuk_shared::RegionMapping;
use thiserror::Error;
use tracing::warn;

use crate::config::{
    analytics_api_url, maps_dir, overlay_cache_ttl_secs, upstream_connect_timeout,
    upstream_http_timeout,
};

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read region mapping {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid region mapping: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("region mapping has no national dataset")]
    MissingNationalDataset,
}

pub fn load_region_mapping(path: &Path) -> Result<RegionMapping, MappingError> {
    let raw = std::fs::read(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_region_mapping(&raw)
}

pub fn parse_region_mapping(raw: &[u8]) -> Result<RegionMapping, MappingError> {
    let mapping: RegionMapping = serde_json::from_slice(raw)?;
    if mapping.national_dataset.trim().is_empty() {
        return Err(MappingError::MissingNationalDataset);
    }
    Ok(mapping)
}

/// Region mapping serialized once at startup, shared by every request.
#[derive(Debug, Clone)]
pub struct MappingPayload {
    pub mapping: Arc<RegionMapping>,
    pub json: Arc<Bytes>,
    pub etag: String,
}

impl MappingPayload {
    pub fn new(mapping: RegionMapping) -> Self {
        // Round-trip through `Value` so object keys come out sorted and the
        // ETag survives restarts.
        let json = serde_json::to_value(&mapping)
            .and_then(|value| serde_json::to_vec(&value))
            .map(Bytes::from)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to serialize region mapping");
                Bytes::from_static(br#"{"national_dataset":"indonesia","datasets":{},"regency_names":{}}"#)
            });
        let etag = format!("\"mapping-{:08x}\"", crc32fast::hash(&json));
        Self {
            mapping: Arc::new(mapping),
            json: Arc::new(json),
            etag,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedOverlay {
    pub body: Bytes,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub region_mapping: MappingPayload,
    /// Directory holding `{file}.geojson` datasets.
    pub maps_dir: PathBuf,
    /// Base URL of the analytics service, no trailing slash.
    pub analytics_api_url: String,
    /// Heatmap responses keyed by `level|mode|layer`.
    pub overlay_cache: Arc<DashMap<String, CachedOverlay>>,
    pub overlay_cache_ttl_secs: i64,
    pub http_client: reqwest::Client,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    mapping_requests_total: AtomicU64,
    overlay_requests_total: AtomicU64,
    overlay_cache_hits_total: AtomicU64,
    overlay_cache_misses_total: AtomicU64,
    overlay_upstream_errors_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub mapping_requests_total: u64,
    pub overlay_requests_total: u64,
    pub overlay_cache_hits_total: u64,
    pub overlay_cache_misses_total: u64,
    pub overlay_upstream_errors_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            mapping_requests_total: self.mapping_requests_total.load(Ordering::Relaxed),
            overlay_requests_total: self.overlay_requests_total.load(Ordering::Relaxed),
            overlay_cache_hits_total: self.overlay_cache_hits_total.load(Ordering::Relaxed),
            overlay_cache_misses_total: self.overlay_cache_misses_total.load(Ordering::Relaxed),
            overlay_upstream_errors_total: self
                .overlay_upstream_errors_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_mapping_request(&self) {
        self.mapping_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overlay_request(&self) {
        self.overlay_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overlay_cache_hit(&self) {
        self.overlay_cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overlay_cache_miss(&self) {
        self.overlay_cache_misses_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overlay_upstream_error(&self) {
        self.overlay_upstream_errors_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(mapping: RegionMapping) -> Self {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("pukpuk-map/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });
        Self {
            region_mapping: MappingPayload::new(mapping),
            maps_dir: maps_dir(),
            analytics_api_url: analytics_api_url(),
            overlay_cache: Arc::new(DashMap::new()),
            overlay_cache_ttl_secs: overlay_cache_ttl_secs(),
            http_client,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mapping_and_rejects_missing_national_dataset() {
        let mapping = parse_region_mapping(
            br#"{"national_dataset":"indonesia","datasets":{"35":"kabupaten"},"regency_names":{}}"#,
        )
        .expect("valid mapping");
        assert_eq!(mapping.datasets.len(), 1);

        assert!(matches!(
            parse_region_mapping(br#"{"national_dataset":"  "}"#),
            Err(MappingError::MissingNationalDataset)
        ));
        assert!(matches!(
            parse_region_mapping(b"not json"),
            Err(MappingError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_region_mapping(Path::new("/definitely/not/here.json"))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn bundled_mapping_covers_every_province() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/region-mapping.json");
        let mapping = load_region_mapping(&path).expect("bundled mapping should load");
        assert_eq!(mapping.national_dataset, "indonesia");
        let provinces = mapping.datasets.keys().filter(|code| code.len() == 2).count();
        assert!(provinces >= 34, "expected every province, got {provinces}");
        assert_eq!(mapping.regency_code_for_name("KABUPATEN SLEMAN"), Some("3404"));
    }

    #[test]
    fn payload_etag_is_stable_for_identical_mapping() {
        let a = MappingPayload::new(RegionMapping {
            national_dataset: "indonesia".to_string(),
            ..RegionMapping::default()
        });
        let b = MappingPayload::new(RegionMapping {
            national_dataset: "indonesia".to_string(),
            ..RegionMapping::default()
        });
        assert_eq!(a.etag, b.etag);
        assert!(a.etag.starts_with("\"mapping-"));
    }
}
