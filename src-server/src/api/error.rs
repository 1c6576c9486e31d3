//! JSON error responses. Every failure leaves the server as `{success: false, error, code}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cir_core::error::AppError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// HTTP wrapper around the shared [`AppError`]; the status is derived from the code prefix.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    pub fn auth_required() -> Self {
        Self(AppError::new(
            "AUTH_REQUIRED",
            "Sign in to access this resource.",
        ))
    }

    pub fn forbidden() -> Self {
        Self(AppError::new(
            "AUTH_FORBIDDEN",
            "Staff access is required for this resource.",
        ))
    }

    pub fn not_found(id: i64) -> Self {
        Self(AppError::new("DB_NOT_FOUND", "Incident not found").with_details(format!("id={id}")))
    }

    pub fn status(&self) -> StatusCode {
        let code = self.0.code.as_str();
        if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else if code == "AUTH_REQUIRED" {
            StatusCode::UNAUTHORIZED
        } else if code == "AUTH_FORBIDDEN" {
            StatusCode::FORBIDDEN
        } else if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let AppError {
            code,
            message,
            details,
            ..
        } = self.0;

        // Server faults keep their details in the log only.
        let details = if status.is_server_error() {
            tracing::error!(%code, %message, details = ?details, "request failed");
            None
        } else {
            details
        };

        let body = ErrorBody {
            success: false,
            error: message,
            code,
            details,
        };
        (status, Json(body)).into_response()
    }
}
