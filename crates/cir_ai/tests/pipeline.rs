use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use cir_ai::llm::Llm;
use cir_ai::pipeline::{
    annotate_incident, AnnotationOutcome, AttachmentUpload, SubmissionPipeline, SubmissionRequest,
};
use cir_core::attachments::{BlobStore, FsBlobStore};
use cir_core::db;
use cir_core::domain::{
    AnnotationStatus, Incident, IncidentFilters, IncidentPatch, IncidentSubmission, NewIncident,
    ReportStatus, ReportType, RiskLevel,
};
use cir_core::error::AppError;
use cir_core::repo::{count_incidents, get_incident, CreatedOrder, IncidentStore};
use pretty_assertions::assert_eq;

const NOW: &str = "2026-02-10T12:00:00Z";

/// Replies per operation, keyed by the schema's required field. `None` makes that call fail.
struct ScriptedLlm {
    category: Option<&'static str>,
    risk: Option<&'static str>,
    summary: Option<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn ok() -> Self {
        Self {
            category: Some(r#"{"aiCategory":"theft"}"#),
            risk: Some(r#"{"aiRiskLevel":"High"}"#),
            summary: Some(r#"{"summary":"A laptop was stolen from the study room."}"#),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Llm for ScriptedLlm {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        format: &serde_json::Value,
    ) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = match format["required"][0].as_str() {
            Some("aiCategory") => self.category,
            Some("aiRiskLevel") => self.risk,
            Some("summary") => self.summary,
            _ => None,
        };
        reply
            .map(str::to_string)
            .ok_or_else(|| AppError::new("AI_REQUEST_FAILED", "scripted failure"))
    }
}

/// Holds every call until three are in flight at once. A call left waiting past the
/// timeout fails, so sequential dispatch shows up as a failed annotation rather than a hang.
struct RendezvousLlm {
    inner: ScriptedLlm,
    arrived: Mutex<usize>,
    all_in: Condvar,
}

impl RendezvousLlm {
    fn new() -> Self {
        Self {
            inner: ScriptedLlm::ok(),
            arrived: Mutex::new(0),
            all_in: Condvar::new(),
        }
    }
}

impl Llm for RendezvousLlm {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        format: &serde_json::Value,
    ) -> Result<String, AppError> {
        let mut arrived = self.arrived.lock().expect("lock");
        *arrived += 1;
        self.all_in.notify_all();
        let (arrived, timeout) = self
            .all_in
            .wait_timeout_while(arrived, Duration::from_secs(5), |n| *n < 3)
            .expect("wait");
        if timeout.timed_out() {
            return Err(AppError::new(
                "AI_REQUEST_FAILED",
                format!("only {} call(s) in flight", *arrived),
            ));
        }
        drop(arrived);
        self.inner.generate(model, prompt, format)
    }
}

struct UnwritableStore;

impl IncidentStore for UnwritableStore {
    fn create_incident(&self, _incident: &NewIncident, _now: &str) -> Result<i64, AppError> {
        Err(AppError::new("DB_WRITE_FAILED", "store unreachable"))
    }
    fn update_incident_fields(
        &self,
        _id: i64,
        _patch: &IncidentPatch,
        _now: &str,
    ) -> Result<(), AppError> {
        Err(AppError::new("DB_WRITE_FAILED", "store unreachable"))
    }
    fn get_incident(&self, _id: i64) -> Result<Option<Incident>, AppError> {
        Ok(None)
    }
    fn list_incidents_for_owner(&self, _user_id: &str) -> Result<Vec<Incident>, AppError> {
        Ok(Vec::new())
    }
    fn list_incidents(
        &self,
        _filters: &IncidentFilters,
        _order: CreatedOrder,
    ) -> Result<Vec<Incident>, AppError> {
        Ok(Vec::new())
    }
}

struct BrokenBlobs;

impl BlobStore for BrokenBlobs {
    fn put(&self, _key: &str, _bytes: &[u8]) -> Result<String, AppError> {
        Err(AppError::new("UPLOAD_FAILED", "bucket unavailable"))
    }
}

fn submission() -> IncidentSubmission {
    IncidentSubmission {
        report_type: "theft".to_string(),
        title: "Laptop stolen".to_string(),
        description: "My laptop was taken from the second floor study room at lunch.".to_string(),
        location_text: "Library, second floor".to_string(),
        date_time: "2026-02-09T18:30:00Z".to_string(),
        allow_follow_up: true,
        contact_email: Some("student@campus.example.edu".to_string()),
        is_anonymous: false,
    }
}

fn request(sub: IncidentSubmission, attachments: Vec<AttachmentUpload>) -> SubmissionRequest {
    SubmissionRequest {
        submission: sub,
        attachments,
        submitter: Some("user-42".to_string()),
    }
}

fn setup() -> (rusqlite::Connection, tempfile::TempDir, FsBlobStore) {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");
    let dir = tempfile::tempdir().expect("tempdir");
    let blobs = FsBlobStore::open(dir.path().to_path_buf(), "http://127.0.0.1:8080");
    (conn, dir, blobs)
}

#[test]
fn valid_submission_resolves_to_new_record_with_matching_fields() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let receipt = pipeline.submit(request(submission(), vec![]), NOW).expect("submit");
    let got = get_incident(&conn, receipt.incident_id)
        .expect("query")
        .expect("exists");

    assert_eq!(got.status, ReportStatus::New);
    assert_eq!(got.report_type, ReportType::Theft);
    assert_eq!(got.title, "Laptop stolen");
    assert_eq!(got.location_text, "Library, second floor");
    assert_eq!(got.date_time, "2026-02-09T18:30:00Z");
    assert_eq!(got.created_by_user_id.as_deref(), Some("user-42"));
    assert_eq!(
        got.contact_email.as_deref(),
        Some("student@campus.example.edu")
    );
    assert!(got.attachments.is_empty());
    assert_eq!(got.created_at, NOW);

    assert_eq!(
        receipt.annotation,
        AnnotationOutcome::Complete {
            category: "theft".to_string(),
            risk_level: RiskLevel::High,
            summary: "A laptop was stolen from the study room.".to_string(),
        }
    );
    assert_eq!(got.ai_status, AnnotationStatus::Complete);
    assert_eq!(got.ai_category.as_deref(), Some("theft"));
    assert_eq!(got.ai_risk_level, Some(RiskLevel::High));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn follow_up_without_email_fails_validation_and_writes_nothing() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let mut sub = submission();
    sub.contact_email = Some("   ".to_string());
    let err = pipeline
        .submit(request(sub, vec![]), NOW)
        .expect_err("should fail");

    assert_eq!(err.code, "VALIDATION_FAILED");
    assert!(err
        .details
        .unwrap_or_default()
        .contains("VALIDATION_CONTACT_EMAIL_REQUIRED"));
    assert_eq!(count_incidents(&conn).expect("count"), 0);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn anonymous_submission_drops_identity_and_contact() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let mut sub = submission();
    sub.is_anonymous = true;
    let receipt = pipeline.submit(request(sub, vec![]), NOW).expect("submit");
    let got = get_incident(&conn, receipt.incident_id)
        .expect("query")
        .expect("exists");

    assert!(got.is_anonymous);
    assert_eq!(got.created_by_user_id, None);
    assert_eq!(got.contact_email, None);
}

#[test]
fn one_failed_annotation_call_discards_the_whole_group() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm {
        risk: None,
        ..ScriptedLlm::ok()
    };
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let receipt = pipeline
        .submit(request(submission(), vec![]), NOW)
        .expect("submission still succeeds");
    assert!(matches!(receipt.annotation, AnnotationOutcome::Failed { .. }));

    let got = get_incident(&conn, receipt.incident_id)
        .expect("query")
        .expect("exists");
    assert_eq!(got.ai_category, None);
    assert_eq!(got.ai_risk_level, None);
    assert_eq!(got.ai_summary, None);
    assert_eq!(got.ai_status, AnnotationStatus::Failed);
    assert!(got.ai_error.unwrap_or_default().contains("scripted failure"));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn out_of_schema_risk_level_counts_as_annotation_failure() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm {
        risk: Some(r#"{"aiRiskLevel":"Extreme"}"#),
        ..ScriptedLlm::ok()
    };
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let receipt = pipeline
        .submit(request(submission(), vec![]), NOW)
        .expect("submit");
    match receipt.annotation {
        AnnotationOutcome::Failed { reason } => assert!(reason.contains("AI_SCHEMA_INVALID")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn free_form_category_is_stored_as_returned() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm {
        category: Some(r#"{"aiCategory":"  vandalism "}"#),
        ..ScriptedLlm::ok()
    };
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let receipt = pipeline
        .submit(request(submission(), vec![]), NOW)
        .expect("submit");
    let got = get_incident(&conn, receipt.incident_id)
        .expect("query")
        .expect("exists");
    assert_eq!(got.ai_category.as_deref(), Some("vandalism"));
}

#[test]
fn n_attachments_yield_n_retrievable_urls_under_the_incident_prefix() {
    let (conn, _dir, blobs) = setup();
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let uploads = vec![
        AttachmentUpload {
            filename: "door.jpg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff],
        },
        AttachmentUpload {
            filename: "notes.txt".to_string(),
            bytes: b"seen at 12:40".to_vec(),
        },
        AttachmentUpload {
            filename: "empty.bin".to_string(),
            bytes: vec![],
        },
    ];
    let receipt = pipeline
        .submit(request(submission(), uploads), NOW)
        .expect("submit");

    assert_eq!(receipt.attachment_urls.len(), 2);
    let prefix = format!(
        "http://127.0.0.1:8080/files/incidents/{}/",
        receipt.incident_id
    );
    for url in &receipt.attachment_urls {
        assert!(url.starts_with(&prefix), "{url} outside {prefix}");
    }
    assert_eq!(
        blobs.read(&receipt.attachment_urls[0]).expect("read"),
        vec![0xff, 0xd8, 0xff]
    );
    assert_eq!(
        blobs.read(&receipt.attachment_urls[1]).expect("read"),
        b"seen at 12:40".to_vec()
    );

    let got = get_incident(&conn, receipt.incident_id)
        .expect("query")
        .expect("exists");
    assert_eq!(got.attachments, receipt.attachment_urls);
}

#[test]
fn upload_failure_fails_submission_but_leaves_base_record() {
    let (conn, _dir, _blobs) = setup();
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &BrokenBlobs,
        llm: &llm,
        model: "mock",
    };

    let uploads = vec![AttachmentUpload {
        filename: "door.jpg".to_string(),
        bytes: vec![1, 2, 3],
    }];
    let err = pipeline
        .submit(request(submission(), uploads), NOW)
        .expect_err("upload fails");
    assert_eq!(err.code, "UPLOAD_FAILED");

    assert_eq!(count_incidents(&conn).expect("count"), 1);
    let orphan = conn
        .list_incidents(&IncidentFilters::default(), CreatedOrder::NewestFirst)
        .expect("list")
        .remove(0);
    assert_eq!(orphan.status, ReportStatus::New);
    assert!(orphan.attachments.is_empty());
    assert_eq!(orphan.ai_status, AnnotationStatus::Pending);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn persistence_failure_is_fatal_and_skips_annotation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blobs = FsBlobStore::open(dir.path().to_path_buf(), "http://127.0.0.1:8080");
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &UnwritableStore,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let err = pipeline
        .submit(request(submission(), vec![]), NOW)
        .expect_err("store down");
    assert_eq!(err.code, "DB_WRITE_FAILED");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn annotation_calls_are_in_flight_together() {
    let llm = RendezvousLlm::new();
    let outcome = annotate_incident(
        &llm,
        "mock",
        "Laptop stolen",
        "My laptop was taken from the second floor study room at lunch.",
    );

    assert_eq!(
        outcome,
        AnnotationOutcome::Complete {
            category: "theft".to_string(),
            risk_level: RiskLevel::High,
            summary: "A laptop was stolen from the study room.".to_string(),
        }
    );
    assert_eq!(llm.inner.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn repeated_attachment_names_get_distinct_urls() {
    let (conn, dir, blobs) = setup();
    let llm = ScriptedLlm::ok();
    let pipeline = SubmissionPipeline {
        store: &conn,
        blobs: &blobs,
        llm: &llm,
        model: "mock",
    };

    let uploads = vec![
        AttachmentUpload {
            filename: "scan.pdf".to_string(),
            bytes: b"front".to_vec(),
        },
        AttachmentUpload {
            filename: "phone/scan.pdf".to_string(),
            bytes: b"back".to_vec(),
        },
    ];
    let receipt = pipeline
        .submit(request(submission(), uploads), NOW)
        .expect("submit");

    let prefix = format!(
        "http://127.0.0.1:8080/files/incidents/{}/",
        receipt.incident_id
    );
    assert_eq!(
        receipt.attachment_urls,
        vec![format!("{prefix}scan.pdf"), format!("{prefix}2-scan.pdf")]
    );
    assert_eq!(
        blobs.read(&receipt.attachment_urls[0]).expect("read"),
        b"front".to_vec()
    );
    assert_eq!(
        blobs.read(&receipt.attachment_urls[1]).expect("read"),
        b"back".to_vec()
    );
    let stored = std::fs::read_dir(dir.path().join(format!("incidents/{}", receipt.incident_id)))
        .expect("list")
        .count();
    assert_eq!(stored, 2);
}
