use serde::{Deserialize, Serialize};

/// What the submitter says happened. Labels match the intake form and the classifier prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportType {
    #[serde(rename = "harassment")]
    Harassment,
    #[serde(rename = "bullying")]
    Bullying,
    #[serde(rename = "theft")]
    Theft,
    #[serde(rename = "mental health")]
    MentalHealth,
    #[serde(rename = "infrastructure issue")]
    InfrastructureIssue,
    #[serde(rename = "other")]
    Other,
}

impl ReportType {
    pub const ALL: [ReportType; 6] = [
        ReportType::Harassment,
        ReportType::Bullying,
        ReportType::Theft,
        ReportType::MentalHealth,
        ReportType::InfrastructureIssue,
        ReportType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Harassment => "harassment",
            ReportType::Bullying => "bullying",
            ReportType::Theft => "theft",
            ReportType::MentalHealth => "mental health",
            ReportType::InfrastructureIssue => "infrastructure issue",
            ReportType::Other => "other",
        }
    }

    /// Accepts the canonical label as well as hyphenated/underscored spellings.
    pub fn parse(s: &str) -> Option<Self> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match norm.as_str() {
            "harassment" => Some(Self::Harassment),
            "bullying" => Some(Self::Bullying),
            "theft" => Some(Self::Theft),
            "mental health" => Some(Self::MentalHealth),
            "infrastructure issue" => Some(Self::InfrastructureIssue),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Staff workflow state. Any status may follow any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportStatus {
    New,
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::New,
        ReportStatus::UnderReview,
        ReportStatus::InProgress,
        ReportStatus::Resolved,
        ReportStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::New => "New",
            ReportStatus::UnderReview => "Under Review",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Resolved => "Resolved",
            ReportStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "New" => Some(Self::New),
            "Under Review" => Some(Self::UnderReview),
            "In Progress" => Some(Self::InProgress),
            "Resolved" => Some(Self::Resolved),
            "Closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            "Critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Sort rank used by the risk ordering; unset sorts last.
pub fn risk_rank(level: Option<RiskLevel>) -> u8 {
    match level {
        Some(RiskLevel::Critical) => 4,
        Some(RiskLevel::High) => 3,
        Some(RiskLevel::Medium) => 2,
        Some(RiskLevel::Low) => 1,
        None => 0,
    }
}

/// Whether the AI annotation pass has run for an incident, and how it ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    Pending,
    Complete,
    Failed,
}

impl AnnotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStatus::Pending => "pending",
            AnnotationStatus::Complete => "complete",
            AnnotationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Canonical stored incident.
///
/// Notes:
/// - Timestamps are RFC3339 UTC strings.
/// - `ai_*` fields stay `None` until an annotation pass completes; `ai_status` says whether one ran.
/// - `contact_email` is only ever set when follow-up is allowed and the report is not anonymous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: i64,
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location_text: String,
    pub date_time: String,
    pub allow_follow_up: bool,
    pub contact_email: Option<String>,
    pub is_anonymous: bool,
    pub created_by_user_id: Option<String>,
    pub attachments: Vec<String>,

    pub ai_category: Option<String>,
    pub ai_risk_level: Option<RiskLevel>,
    pub ai_summary: Option<String>,
    pub ai_status: AnnotationStatus,
    pub ai_error: Option<String>,

    pub status: ReportStatus,
    pub admin_notes: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

/// Submission fields persisted at creation. Already validated and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncident {
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub location_text: String,
    pub date_time: String,
    pub allow_follow_up: bool,
    pub contact_email: Option<String>,
    pub is_anonymous: bool,
    pub created_by_user_id: Option<String>,
}

/// Raw submission as received from the intake form. Nothing here is trusted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentSubmission {
    pub report_type: String,
    pub title: String,
    pub description: String,
    pub location_text: String,
    pub date_time: String,
    pub allow_follow_up: bool,
    pub contact_email: Option<String>,
    pub is_anonymous: bool,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentPatch {
    pub attachments: Option<Vec<String>>,
    pub ai_category: Option<String>,
    pub ai_risk_level: Option<RiskLevel>,
    pub ai_summary: Option<String>,
    pub ai_status: Option<AnnotationStatus>,
    pub ai_error: Option<String>,
    pub status: Option<ReportStatus>,
    pub admin_notes: Option<String>,
}

/// Equality predicates pushed down to the store; combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilters {
    pub status: Option<ReportStatus>,
    pub risk_level: Option<RiskLevel>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Risk,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}
