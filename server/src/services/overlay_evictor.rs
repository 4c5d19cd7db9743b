use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;

use crate::config::OVERLAY_EVICTION_INTERVAL_SECS;
use crate::state::{AppState, CachedOverlay};

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(OVERLAY_EVICTION_INTERVAL_SECS));

    loop {
        interval.tick().await;

        let evicted = evict_expired(&state.overlay_cache, Utc::now(), state.overlay_cache_ttl_secs);
        if evicted > 0 {
            info!(
                "evicted {evicted} stale heatmap cache entries ({} remaining)",
                state.overlay_cache.len()
            );
        }
    }
}

fn evict_expired(
    cache: &DashMap<String, CachedOverlay>,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> usize {
    let before = cache.len();
    cache.retain(|_, cached| now.signed_duration_since(cached.fetched_at).num_seconds() < ttl_secs);
    before.saturating_sub(cache.len())
}
