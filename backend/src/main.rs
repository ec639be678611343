//! Formwork backend server.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use formwork_backend::api::{routes::create_router, AppState};
use formwork_backend::storage::Stores;
use formwork_backend::{telemetry, Config, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        storage_backend = %config.storage_backend,
        "Starting Formwork backend"
    );
    tracing::debug!(?config, "Loaded configuration");

    let stores = Stores::from_config(&config)?;
    let state = Arc::new(AppState::new(config.clone(), stores));

    // Subscribe before anything is published so bootstrap events are audited.
    let _audit_task = state.audit_service.clone().spawn(&state.events);

    if let Some(password) = state
        .user_service
        .ensure_bootstrap_admin(&config.admin_username, config.admin_password.clone())
        .await?
    {
        tracing::warn!(
            username = %config.admin_username,
            password = %password,
            "Generated bootstrap admin password; it will not be shown again"
        );
    }

    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
