use axum::extract::State;
use axum::Json;
use cir_ai::ollama::OllamaClient;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AiHealthStatus {
    pub ok: bool,
    pub message: String,
}

/// `GET /api/health`: liveness.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
    })
}

/// `GET /api/health/ai`: whether the local model host answers.
pub async fn ai(State(state): State<AppState>) -> Result<Json<AiHealthStatus>, ApiError> {
    let base_url = state.ollama_url.clone();
    let status = run_blocking(move || {
        let client = OllamaClient::new(&base_url)?;
        Ok(match client.health_check() {
            Ok(()) => AiHealthStatus {
                ok: true,
                message: format!("Model host reachable at {}", client.base_url()),
            },
            Err(e) => AiHealthStatus {
                ok: false,
                message: e.message,
            },
        })
    })
    .await?;
    Ok(Json(status))
}
