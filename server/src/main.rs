mod app;
mod config;
mod routes;
mod services;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mapping_path = config::region_mapping_path();
    let mapping = match state::load_region_mapping(&mapping_path) {
        Ok(mapping) => mapping,
        Err(e) => {
            tracing::error!(error = %e, "failed to load region mapping");
            return;
        }
    };
    tracing::info!(
        path = %mapping_path.display(),
        datasets = mapping.datasets.len(),
        regency_names = mapping.regency_names.len(),
        "Region mapping loaded"
    );

    let state = AppState::new(mapping);
    if !state.maps_dir.is_dir() {
        tracing::warn!(
            maps_dir = %state.maps_dir.display(),
            "map dataset directory does not exist; /maps requests will 404"
        );
    }
    tracing::info!(analytics_api_url = %state.analytics_api_url, "Proxying analytics overlay");

    tokio::spawn(services::overlay_evictor::run(state.clone()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Pukpuk map server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
