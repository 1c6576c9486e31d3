//! Reporter-facing endpoints: submission and reading one's own reports.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use cir_ai::pipeline::{AttachmentUpload, SubmissionPipeline, SubmissionRequest};
use cir_core::domain::{Incident, IncidentSubmission};
use cir_core::error::AppError;
use cir_core::repo::IncidentStore;
use cir_core::timestamps::now_rfc3339_utc;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::identity::Caller;
use crate::api::types::{run_blocking, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub report_id: i64,
}

fn form_error(e: MultipartError) -> ApiError {
    ApiError(
        AppError::new("VALIDATION_FORM_INVALID", "The submitted form could not be read.")
            .with_details(e.body_text()),
    )
}

fn checkbox(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes"
    )
}

/// Collect the named form fields and every `attachments` file part.
async fn read_submission_form(
    mut form: Multipart,
) -> Result<(IncidentSubmission, Vec<AttachmentUpload>), ApiError> {
    let mut sub = IncidentSubmission::default();
    let mut attachments = Vec::new();

    while let Some(field) = form.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "attachments" || name == "attachments[]" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(form_error)?;
            attachments.push(AttachmentUpload {
                filename,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(form_error)?;
        match name.as_str() {
            "reportType" => sub.report_type = value,
            "title" => sub.title = value,
            "description" => sub.description = value,
            "locationText" => sub.location_text = value,
            "dateTime" => sub.date_time = value,
            "allowFollowUp" => sub.allow_follow_up = checkbox(&value),
            "contactEmail" => sub.contact_email = Some(value),
            "isAnonymous" => sub.is_anonymous = checkbox(&value),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok((sub, attachments))
}

/// `POST /api/reports`: multipart incident submission.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let caller = Caller::from_headers(&headers);
    let (submission, attachments) = read_submission_form(form).await?;

    let receipt = run_blocking(move || {
        let now = now_rfc3339_utc()?;
        let conn = state.open_store()?;
        let pipeline = SubmissionPipeline {
            store: &conn,
            blobs: state.blobs.as_ref(),
            llm: state.llm.as_ref(),
            model: &state.model,
        };
        pipeline.submit(
            SubmissionRequest {
                submission,
                attachments,
                submitter: caller.user_id,
            },
            &now,
        )
    })
    .await?;

    Ok(Json(SubmitResponse {
        success: true,
        report_id: receipt.incident_id,
    }))
}

/// `GET /api/reports/mine`: the caller's named reports, newest first.
pub async fn mine(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let caller = Caller::from_headers(&headers);
    let user_id = caller.require_user()?.to_string();
    let incidents = run_blocking(move || {
        let conn = state.open_store()?;
        conn.list_incidents_for_owner(&user_id)
    })
    .await?;
    Ok(Json(incidents))
}

/// `GET /api/reports/:id`: one incident, for its owner or staff.
///
/// Incidents the caller may not see answer 404, the same as missing ids.
pub async fn detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Incident>, ApiError> {
    let caller = Caller::from_headers(&headers);
    if !caller.is_staff {
        caller.require_user()?;
    }

    let incident = run_blocking(move || {
        let conn = state.open_store()?;
        conn.get_incident(id)
    })
    .await?;

    match incident {
        Some(incident) if caller.can_view(&incident) => Ok(Json(incident)),
        _ => Err(ApiError::not_found(id)),
    }
}
