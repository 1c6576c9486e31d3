pub mod api;
pub mod config;

use std::sync::Arc;

use cir_ai::llm::ollama_llm::OllamaLlm;
use cir_ai::ollama::OllamaClient;
use cir_core::attachments::FsBlobStore;
use cir_core::error::AppError;
use tracing_subscriber::EnvFilter;

use crate::api::router::build_router;
use crate::api::types::AppState;
use crate::config::ServerConfig;

fn init_tracing(fallback_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter)),
        )
        .try_init();
}

/// Build handler state from configuration, creating the data directory and schema if needed.
pub fn build_state(config: &ServerConfig) -> Result<AppState, AppError> {
    config.ensure_data_dirs()?;
    cir_core::db::open_and_migrate(&config.db_path())?;

    let client = OllamaClient::new(&config.ollama_url)?;
    Ok(AppState {
        db_path: config.db_path(),
        blobs: Arc::new(FsBlobStore::open(config.blobs_dir(), &config.public_url)),
        llm: Arc::new(OllamaLlm::new(client)),
        model: config.model.clone(),
        ollama_url: config.ollama_url.clone(),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

pub async fn run() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_filter);

    tracing::info!(
        version = crate::config::APP_VERSION,
        data_dir = %config.data_dir.display(),
        model = %config.model,
        "IncidentDesk starting"
    );

    let state = build_state(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| {
            AppError::new("SERVER_BIND_FAILED", "Failed to bind listen address")
                .with_details(format!("addr={}; err={}", config.bind, e))
        })?;
    tracing::info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::new("SERVER_FAILED", "HTTP server stopped").with_details(e.to_string()))
}
