use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use pukpuk_shared::{
    DataLayer, HeatmapQuery, HeatmapResponse, ROOT_CODE, RegionLevel, ViewMode, is_root_code,
};
use serde::Deserialize;
use tracing::warn;

use crate::config::MAX_OVERLAY_CACHE_ENTRIES;
use crate::state::{AppState, CachedOverlay, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const MAPPING_CACHE_CONTROL: &str = "public, max-age=300";
const OVERLAY_CACHE_CONTROL: &str = "private, max-age=30";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mapping = &state.region_mapping.mapping;
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "datasets": mapping.datasets.len(),
        "regency_names": mapping.regency_names.len(),
        "overlay_cache_size": state.overlay_cache.len(),
        "observability": {
            "mapping_requests_total": observability.mapping_requests_total,
            "overlay_requests_total": observability.overlay_requests_total,
            "overlay_cache_hits_total": observability.overlay_cache_hits_total,
            "overlay_cache_misses_total": observability.overlay_cache_misses_total,
            "overlay_upstream_errors_total": observability.overlay_upstream_errors_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let dataset_count = state.region_mapping.mapping.datasets.len();
    let overlay_cache_size = state.overlay_cache.len();
    let observability = state.observability.snapshot();

    let body = render_prometheus_metrics(dataset_count, overlay_cache_size, observability);

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    dataset_count: usize,
    overlay_cache_size: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    write_metric(
        &mut body,
        "pukpuk_region_datasets",
        "gauge",
        "Number of region codes with a map dataset.",
        dataset_count as u64,
    );
    write_metric(
        &mut body,
        "pukpuk_overlay_cache_size",
        "gauge",
        "Current number of cached heatmap responses.",
        overlay_cache_size as u64,
    );
    write_metric(
        &mut body,
        "pukpuk_mapping_requests_total",
        "counter",
        "Total region mapping API requests.",
        observability.mapping_requests_total,
    );
    write_metric(
        &mut body,
        "pukpuk_overlay_requests_total",
        "counter",
        "Total demand heatmap API requests.",
        observability.overlay_requests_total,
    );
    write_metric(
        &mut body,
        "pukpuk_overlay_cache_hits_total",
        "counter",
        "Heatmap requests served from cache.",
        observability.overlay_cache_hits_total,
    );
    write_metric(
        &mut body,
        "pukpuk_overlay_cache_misses_total",
        "counter",
        "Heatmap requests forwarded to the analytics service.",
        observability.overlay_cache_misses_total,
    );
    write_metric(
        &mut body,
        "pukpuk_overlay_upstream_errors_total",
        "counter",
        "Analytics service failures while serving heatmap requests.",
        observability.overlay_upstream_errors_total,
    );
    body
}

fn write_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(body, "# HELP {name} {help}");
    let _ = writeln!(body, "# TYPE {name} {kind}");
    let _ = writeln!(body, "{name} {value}");
}

/// Serve the pre-serialized region mapping.
pub async fn get_region_mapping(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.observability.record_mapping_request();
    let payload = &state.region_mapping;

    if if_none_match_matches(&headers, &payload.etag) {
        return not_modified_response(MAPPING_CACHE_CONTROL, Some(payload.etag.as_str()));
    }

    json_bytes_response(
        (*payload.json).clone(),
        MAPPING_CACHE_CONTROL,
        Some(payload.etag.as_str()),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct HeatmapParams {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub layer: Option<String>,
}

/// Proxy the analytics service's heatmap for one view, with a short-lived cache.
pub async fn get_demand_heatmap(
    State(state): State<AppState>,
    Query(params): Query<HeatmapParams>,
) -> Result<Response, StatusCode> {
    state.observability.record_overlay_request();
    let query = parse_heatmap_query(&params)?;
    let key = query.cache_key();

    if let Some(cached) = state.overlay_cache.get(&key) {
        let age = Utc::now()
            .signed_duration_since(cached.fetched_at)
            .num_seconds();
        if age < state.overlay_cache_ttl_secs {
            state.observability.record_overlay_cache_hit();
            return Ok(json_bytes_response(
                cached.body.clone(),
                OVERLAY_CACHE_CONTROL,
                None,
            ));
        }
    }
    state.observability.record_overlay_cache_miss();

    let body = fetch_heatmap(&state, &query).await.inspect_err(|_| {
        state.observability.record_overlay_upstream_error();
    })?;

    cache_overlay_payload(&state, key, body.clone());

    Ok(json_bytes_response(body, OVERLAY_CACHE_CONTROL, None))
}

fn parse_heatmap_query(params: &HeatmapParams) -> Result<HeatmapQuery, StatusCode> {
    let level = params
        .level
        .as_deref()
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(ROOT_CODE);
    let level = if is_root_code(level) {
        ROOT_CODE.to_string()
    } else if RegionLevel::from_code(level).is_some() {
        level.to_string()
    } else {
        return Err(StatusCode::BAD_REQUEST);
    };

    let mode = match params.mode.as_deref().map(str::trim) {
        None | Some("") => ViewMode::default(),
        Some(raw) => ViewMode::parse(raw).ok_or(StatusCode::BAD_REQUEST)?,
    };
    let layer = match params.layer.as_deref().map(str::trim) {
        None | Some("") => DataLayer::default(),
        Some(raw) => DataLayer::parse(raw).ok_or(StatusCode::BAD_REQUEST)?,
    };

    Ok(HeatmapQuery { level, mode, layer })
}

fn heatmap_url(base: &str, query: &HeatmapQuery) -> Result<reqwest::Url, StatusCode> {
    let mut url = reqwest::Url::parse(&format!("{base}/demand-heatmap")).map_err(|e| {
        warn!(error = %e, base, "invalid analytics service URL");
        StatusCode::BAD_GATEWAY
    })?;
    url.query_pairs_mut()
        .append_pair("level", &query.level)
        .append_pair("mode", query.mode.as_str())
        .append_pair("layer", query.layer.as_str());
    Ok(url)
}

/// Fetch and normalise one heatmap payload from the analytics service.
async fn fetch_heatmap(state: &AppState, query: &HeatmapQuery) -> Result<Bytes, StatusCode> {
    let url = heatmap_url(&state.analytics_api_url, query)?;
    let resp = state.http_client.get(url).send().await.map_err(|e| {
        warn!(error = %e, level = %query.level, "analytics service request failed");
        StatusCode::BAD_GATEWAY
    })?;

    if !resp.status().is_success() {
        warn!(
            status = resp.status().as_u16(),
            level = %query.level,
            "analytics service returned an error status"
        );
        return Err(StatusCode::BAD_GATEWAY);
    }

    let raw = resp.bytes().await.map_err(|e| {
        warn!(error = %e, "failed to read analytics service response");
        StatusCode::BAD_GATEWAY
    })?;
    let parsed: HeatmapResponse = serde_json::from_slice(&raw).map_err(|e| {
        warn!(error = %e, level = %query.level, "analytics service returned malformed heatmap");
        StatusCode::BAD_GATEWAY
    })?;

    serde_json::to_vec(&parsed)
        .map(Bytes::from)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

fn cache_overlay_payload(state: &AppState, key: String, body: Bytes) {
    if !state.overlay_cache.contains_key(&key) {
        while state.overlay_cache.len() >= MAX_OVERLAY_CACHE_ENTRIES {
            if !evict_oldest_overlay_entry(state) {
                break;
            }
        }
    }

    state.overlay_cache.insert(
        key,
        CachedOverlay {
            body,
            fetched_at: Utc::now(),
        },
    );
}

fn evict_oldest_overlay_entry(state: &AppState) -> bool {
    let Some(oldest_key) = state
        .overlay_cache
        .iter()
        .min_by_key(|entry| entry.value().fetched_at)
        .map(|entry| entry.key().clone())
    else {
        return false;
    };
    state.overlay_cache.remove(&oldest_key).is_some()
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
