use std::collections::HashSet;
use std::thread::{self, ScopedJoinHandle};

use cir_core::attachments::{claim_filename, upload_attachment, BlobStore};
use cir_core::domain::{AnnotationStatus, IncidentPatch, IncidentSubmission, RiskLevel};
use cir_core::error::AppError;
use cir_core::repo::IncidentStore;
use cir_core::validate::validate_submission;
use serde::{Deserialize, Serialize};

use crate::annotate::{classify_incident, estimate_risk_level, summarize_description};
use crate::llm::Llm;

/// One uploaded file as received from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub submission: IncidentSubmission,
    pub attachments: Vec<AttachmentUpload>,
    /// Authenticated user id from the identity provider, if signed in.
    pub submitter: Option<String>,
}

/// Result of the annotation fan-out. Partial results are never kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnnotationOutcome {
    Complete {
        category: String,
        risk_level: RiskLevel,
        summary: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub incident_id: i64,
    pub attachment_urls: Vec<String>,
    pub annotation: AnnotationOutcome,
}

fn join_call<T>(
    operation: &str,
    handle: ScopedJoinHandle<'_, Result<T, AppError>>,
) -> Result<T, AppError> {
    handle.join().unwrap_or_else(|_| {
        Err(AppError::new(
            "AI_CALL_PANICKED",
            format!("Annotation call {operation} panicked"),
        ))
    })
}

/// Run classify, risk and summary concurrently and join them as one unit.
///
/// If any call fails the whole group is `Failed`; results from the calls that succeeded are dropped.
pub fn annotate_incident(
    llm: &dyn Llm,
    model: &str,
    title: &str,
    description: &str,
) -> AnnotationOutcome {
    let (category, risk, summary) = thread::scope(|s| {
        let category = s.spawn(|| classify_incident(llm, model, description));
        let risk = s.spawn(|| estimate_risk_level(llm, model, title, description));
        let summary = s.spawn(|| summarize_description(llm, model, description));
        (
            join_call("classify", category),
            join_call("estimate_risk", risk),
            join_call("summarize", summary),
        )
    });

    match (category, risk, summary) {
        (Ok(category), Ok(risk_level), Ok(summary)) => AnnotationOutcome::Complete {
            category,
            risk_level,
            summary,
        },
        (category, risk, summary) => {
            let reasons: Vec<String> = [
                category.err(),
                risk.err(),
                summary.err(),
            ]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect();
            AnnotationOutcome::Failed {
                reason: reasons.join("; "),
            }
        }
    }
}

fn outcome_patch(outcome: &AnnotationOutcome) -> IncidentPatch {
    match outcome {
        AnnotationOutcome::Complete {
            category,
            risk_level,
            summary,
        } => IncidentPatch {
            ai_category: Some(category.clone()),
            ai_risk_level: Some(*risk_level),
            ai_summary: Some(summary.clone()),
            ai_status: Some(AnnotationStatus::Complete),
            ..IncidentPatch::default()
        },
        AnnotationOutcome::Failed { reason } => IncidentPatch {
            ai_status: Some(AnnotationStatus::Failed),
            ai_error: Some(reason.clone()),
            ..IncidentPatch::default()
        },
    }
}

/// Submission orchestration over injected store, blob store and model.
pub struct SubmissionPipeline<'a> {
    pub store: &'a dyn IncidentStore,
    pub blobs: &'a dyn BlobStore,
    pub llm: &'a dyn Llm,
    pub model: &'a str,
}

impl SubmissionPipeline<'_> {
    /// Validate, persist, upload attachments, annotate.
    ///
    /// Success means the base record was written and every attachment stored. Annotation is
    /// best effort: its outcome is recorded on the incident and in the receipt, never returned
    /// as an error. An upload failure leaves the base record in place without attachments.
    /// All writes of one submission are stamped with `now`.
    pub fn submit(&self, req: SubmissionRequest, now: &str) -> Result<SubmissionReceipt, AppError> {
        let incident = validate_submission(&req.submission, req.submitter.as_deref(), now)
            .map_err(|e| {
                tracing::warn!(code = %e.code, message = %e.message, "submission rejected");
                e
            })?;

        let incident_id = self.store.create_incident(&incident, now).map_err(|e| {
            tracing::error!(error = %e, details = ?e.details, "failed to persist incident");
            e
        })?;

        let mut attachment_urls = Vec::new();
        let mut taken = HashSet::new();
        for upload in req.attachments.iter().filter(|a| !a.bytes.is_empty()) {
            let filename = claim_filename(&upload.filename, &mut taken);
            let url = upload_attachment(self.blobs, incident_id, &filename, &upload.bytes)
                .map_err(|e| {
                    tracing::error!(
                        incident_id,
                        filename = %upload.filename,
                        error = %e,
                        details = ?e.details,
                        "attachment upload failed; incident left without attachments"
                    );
                    e
                })?;
            attachment_urls.push(url);
        }

        if !attachment_urls.is_empty() {
            let patch = IncidentPatch {
                attachments: Some(attachment_urls.clone()),
                ..IncidentPatch::default()
            };
            self.store
                .update_incident_fields(incident_id, &patch, now)
                .map_err(|e| {
                    tracing::error!(incident_id, error = %e, "failed to record attachment urls");
                    e
                })?;
        }

        let mut annotation =
            annotate_incident(self.llm, self.model, &incident.title, &incident.description);
        if let AnnotationOutcome::Failed { reason } = &annotation {
            tracing::warn!(incident_id, reason = %reason, "annotation failed; incident kept without AI fields");
        }

        if let Err(e) = self
            .store
            .update_incident_fields(incident_id, &outcome_patch(&annotation), now)
        {
            tracing::warn!(incident_id, error = %e, "failed to record annotation outcome");
            annotation = AnnotationOutcome::Failed {
                reason: e.to_string(),
            };
        }

        tracing::info!(
            incident_id,
            attachments = attachment_urls.len(),
            annotated = matches!(annotation, AnnotationOutcome::Complete { .. }),
            "incident submitted"
        );

        Ok(SubmissionReceipt {
            incident_id,
            attachment_urls,
            annotation,
        })
    }
}
