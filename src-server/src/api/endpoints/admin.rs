//! Staff-only endpoints. Every handler checks the staff role before touching the store.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use cir_core::analytics::{build_analytics, AnalyticsPayload};
use cir_core::domain::{Incident, ReportStatus};
use cir_core::error::AppError;
use cir_core::export::export_dashboard_csv;
use cir_core::query::{run_dashboard_query, DashboardQuery};
use cir_core::repo::update_incident_status;
use cir_core::timestamps::now_rfc3339_utc;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::identity::Caller;
use crate::api::types::{run_blocking, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub admin_notes: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
}

/// `GET /api/admin/incidents?status=&risk=&category=&sort=&q=`
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    Caller::from_headers(&headers).require_staff()?;
    let incidents = run_blocking(move || {
        let conn = state.open_store()?;
        run_dashboard_query(&conn, &query)
    })
    .await?;
    Ok(Json(incidents))
}

/// `GET /api/admin/incidents.csv`: same view as [`list`], as a download.
pub async fn export_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Caller::from_headers(&headers).require_staff()?;
    let csv_text = run_blocking(move || {
        let conn = state.open_store()?;
        export_dashboard_csv(&conn, &query)
    })
    .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"incidents.csv\"",
            ),
        ],
        csv_text,
    ))
}

/// `POST /api/admin/incidents/:id/status`: last write wins.
pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    Caller::from_headers(&headers).require_staff()?;
    let status = ReportStatus::parse(&req.status).ok_or_else(|| {
        ApiError(
            AppError::new("VALIDATION_STATUS_INVALID", "Unknown incident status.")
                .with_details(format!("status={}", req.status)),
        )
    })?;

    run_blocking(move || {
        let now = now_rfc3339_utc()?;
        let conn = state.open_store()?;
        update_incident_status(&conn, id, status, req.admin_notes.trim(), &now)
    })
    .await?;

    Ok(Json(StatusUpdateResponse { success: true }))
}

/// `GET /api/admin/analytics`
pub async fn analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsPayload>, ApiError> {
    Caller::from_headers(&headers).require_staff()?;
    let payload = run_blocking(move || {
        let conn = state.open_store()?;
        build_analytics(&conn)
    })
    .await?;
    Ok(Json(payload))
}
