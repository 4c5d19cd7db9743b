use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ANALYTICS_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REGION_MAPPING_PATH: &str = "data/region-mapping.json";
pub const DEFAULT_MAPS_DIR: &str = "data/maps";
pub const CLIENT_DIST_DIR: &str = "client/dist";

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_OVERLAY_CACHE_TTL_SECS: i64 = 60;
pub const MAX_OVERLAY_CACHE_ENTRIES: usize = 512;
pub const OVERLAY_EVICTION_INTERVAL_SECS: u64 = 120;

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

/// Base URL of the analytics service, without a trailing slash.
pub fn analytics_api_url() -> String {
    std::env::var("ANALYTICS_API_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ANALYTICS_API_URL.to_string())
}

pub fn region_mapping_path() -> PathBuf {
    path_from_env("REGION_MAPPING_PATH", DEFAULT_REGION_MAPPING_PATH)
}

pub fn maps_dir() -> PathBuf {
    path_from_env("MAPS_DIR", DEFAULT_MAPS_DIR)
}

fn path_from_env(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

pub fn overlay_cache_ttl_secs() -> i64 {
    std::env::var("OVERLAY_CACHE_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_OVERLAY_CACHE_TTL_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        temp_env::with_vars_unset(
            [
                "SERVER_PORT",
                "ANALYTICS_API_URL",
                "UPSTREAM_HTTP_TIMEOUT_SECS",
                "OVERLAY_CACHE_TTL_SECS",
                "MAPS_DIR",
            ],
            || {
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(analytics_api_url(), DEFAULT_ANALYTICS_API_URL);
                assert_eq!(upstream_http_timeout(), Duration::from_secs(10));
                assert_eq!(overlay_cache_ttl_secs(), DEFAULT_OVERLAY_CACHE_TTL_SECS);
                assert_eq!(maps_dir(), PathBuf::from(DEFAULT_MAPS_DIR));
            },
        );
    }

    #[test]
    fn env_overrides_are_parsed() {
        temp_env::with_vars(
            [
                ("SERVER_PORT", Some("8080")),
                ("ANALYTICS_API_URL", Some("https://pukpuk-api.example/api/")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("4")),
                ("OVERLAY_CACHE_TTL_SECS", Some("15")),
                ("REGION_MAPPING_PATH", Some("/srv/mapping.json")),
            ],
            || {
                assert_eq!(server_port(), 8080);
                assert_eq!(analytics_api_url(), "https://pukpuk-api.example/api");
                assert_eq!(upstream_http_timeout(), Duration::from_secs(4));
                assert_eq!(overlay_cache_ttl_secs(), 15);
                assert_eq!(region_mapping_path(), PathBuf::from("/srv/mapping.json"));
            },
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("SERVER_PORT", Some("0")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("soon")),
                ("OVERLAY_CACHE_TTL_SECS", Some("-5")),
                ("ANALYTICS_API_URL", Some("   ")),
            ],
            || {
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(3));
                assert_eq!(overlay_cache_ttl_secs(), DEFAULT_OVERLAY_CACHE_TTL_SECS);
                assert_eq!(analytics_api_url(), DEFAULT_ANALYTICS_API_URL);
            },
        );
    }
}
