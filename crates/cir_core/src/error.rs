use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used across backend layers and exposed over HTTP.
///
/// Codes are grouped by prefix: `VALIDATION_*`, `DB_*`, `UPLOAD_*`, `AI_*`, `AUTH_*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_validation(&self) -> bool {
        self.code.starts_with("VALIDATION_")
    }

    pub fn is_not_found(&self) -> bool {
        self.code == "DB_NOT_FOUND"
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
