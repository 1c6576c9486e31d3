use std::path::PathBuf;
use std::sync::Arc;

use cir_ai::llm::Llm;
use cir_core::attachments::FsBlobStore;
use cir_core::error::AppError;
use rusqlite::Connection;

use crate::api::error::ApiError;

/// Shared handler state. Cheap to clone; every request opens its own SQLite connection.
#[derive(Clone)]
pub struct AppState {
    pub db_path: PathBuf,
    pub blobs: Arc<FsBlobStore>,
    pub llm: Arc<dyn Llm>,
    pub model: String,
    pub ollama_url: String,
}

impl AppState {
    pub fn open_store(&self) -> Result<Connection, AppError> {
        cir_core::db::open_and_migrate(&self.db_path)
    }
}

/// Run a synchronous core call off the async executor.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            ApiError(
                AppError::new("INTERNAL_TASK_FAILED", "Background task did not complete")
                    .with_details(e.to_string()),
            )
        })?
        .map_err(ApiError::from)
}
