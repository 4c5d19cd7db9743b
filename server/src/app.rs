use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::config::CLIENT_DIST_DIR;
use crate::routes;
use crate::state::AppState;

const DATASET_CACHE_CONTROL: &str = "public, max-age=86400";

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(CLIENT_DIST_DIR)
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    // GeoJSON boundaries are large and change only on redeploy.
    let datasets = Router::new()
        .fallback_service(ServeDir::new(&state.maps_dir).precompressed_gzip())
        .layer(middleware::from_fn(set_dataset_cache_control));

    let app = Router::new()
        .route(
            "/api/regions/mapping",
            axum::routing::get(routes::api::get_region_mapping),
        )
        .route(
            "/api/demand-heatmap",
            axum::routing::get(routes::api::get_demand_heatmap),
        )
        .route("/api/health", axum::routing::get(routes::api::health))
        .route("/api/metrics", axum::routing::get(routes::api::metrics))
        .nest_service("/maps", datasets);

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

async fn set_dataset_cache_control(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if response.status().is_success() {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(DATASET_CACHE_CONTROL),
        );
    }
    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_hashed_bundle_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.starts_with("/fonts/") || path.starts_with("/icons/") {
        return Some("public, max-age=86400");
    }

    None
}

fn is_hashed_bundle_asset(path: &str) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }

    let Some(filename) = Path::new(path).file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    filename
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}
