use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use cir_core::error::AppError;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Largest multipart body accepted by the submission endpoint (all attachments together).
pub const MAX_SUBMISSION_BYTES: usize = 25 * 1024 * 1024;

const DB_FILE_NAME: &str = "incidents.sqlite";
const BLOBS_DIR_NAME: &str = "blobs";

pub fn default_log_filter() -> &'static str {
    "incidentdesk=info,cir_core=info,cir_ai=info,tower_http=info"
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_string(name, default))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub public_url: String,
    pub ollama_url: String,
    pub model: String,
    pub log_filter: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let bind_raw = env_string("INCIDENTDESK_BIND", DEFAULT_BIND);
        let bind = bind_raw.parse::<SocketAddr>().map_err(|e| {
            AppError::new("CONFIG_BIND_INVALID", "INCIDENTDESK_BIND is not a socket address")
                .with_details(format!("value={bind_raw}; err={e}"))
        })?;

        Ok(Self {
            bind,
            data_dir: env_path("INCIDENTDESK_DATA_DIR", DEFAULT_DATA_DIR),
            public_url: env_string("INCIDENTDESK_PUBLIC_URL", DEFAULT_PUBLIC_URL),
            ollama_url: env_string("INCIDENTDESK_OLLAMA_URL", DEFAULT_OLLAMA_URL),
            model: env_string("INCIDENTDESK_MODEL", DEFAULT_MODEL),
            log_filter: env_string("INCIDENTDESK_LOG", default_log_filter()),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join(BLOBS_DIR_NAME)
    }

    pub fn ensure_data_dirs(&self) -> Result<(), AppError> {
        for dir in [self.data_dir.clone(), self.blobs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::new("CONFIG_DATA_DIR_FAILED", "Failed to create data directory")
                    .with_details(format!("path={}; err={}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}
