use crate::domain::{IncidentSubmission, NewIncident, ReportType, ValidationIssue};
use crate::error::AppError;
use crate::timestamps::{format_rfc3339_utc, parse_incident_datetime, parse_rfc3339, INCIDENT_DATE_FLOOR};

pub const TITLE_MIN_CHARS: usize = 5;
pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const LOCATION_MIN_CHARS: usize = 5;

fn min_chars(
    field: &str,
    label: &str,
    value: &str,
    min: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    if value.trim().chars().count() < min {
        issues.push(ValidationIssue::new(
            field,
            "VALIDATION_TOO_SHORT",
            format!("{label} must be at least {min} characters long."),
        ));
    }
}

/// Minimal `local@domain.tld` shape check; no DNS or RFC 5322 parsing.
pub fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !host.starts_with('.')
}

/// Check a raw submission and produce the normalized record to persist.
///
/// All issues are collected; nothing is returned until every rule passes. Normalization:
/// - `contact_email` is kept only when follow-up is allowed and the report is not anonymous.
/// - `created_by_user_id` is the submitter for named reports and `None` for anonymous ones.
pub fn check_submission(
    sub: &IncidentSubmission,
    submitter: Option<&str>,
    now: &str,
) -> Result<Result<NewIncident, Vec<ValidationIssue>>, AppError> {
    let now = parse_rfc3339("now", now)?;
    let mut issues = Vec::new();

    let report_type = ReportType::parse(&sub.report_type);
    if report_type.is_none() {
        issues.push(ValidationIssue::new(
            "reportType",
            "VALIDATION_REPORT_TYPE_INVALID",
            "Please select a report type.",
        ));
    }

    min_chars("title", "Title", &sub.title, TITLE_MIN_CHARS, &mut issues);
    min_chars(
        "description",
        "Description",
        &sub.description,
        DESCRIPTION_MIN_CHARS,
        &mut issues,
    );
    min_chars(
        "locationText",
        "Location",
        &sub.location_text,
        LOCATION_MIN_CHARS,
        &mut issues,
    );

    let date_time = match parse_incident_datetime(&sub.date_time) {
        None => {
            issues.push(ValidationIssue::new(
                "dateTime",
                "VALIDATION_DATE_INVALID",
                "A valid incident date is required.",
            ));
            None
        }
        Some(dt) if dt > now => {
            issues.push(ValidationIssue::new(
                "dateTime",
                "VALIDATION_DATE_IN_FUTURE",
                "Incident date cannot be in the future.",
            ));
            None
        }
        Some(dt) if dt < INCIDENT_DATE_FLOOR => {
            issues.push(ValidationIssue::new(
                "dateTime",
                "VALIDATION_DATE_TOO_OLD",
                "Incident date cannot be before 1900-01-01.",
            ));
            None
        }
        Some(dt) => Some(dt),
    };

    let wants_contact = sub.allow_follow_up && !sub.is_anonymous;
    let contact_email = sub
        .contact_email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if wants_contact {
        match contact_email {
            None => issues.push(ValidationIssue::new(
                "contactEmail",
                "VALIDATION_CONTACT_EMAIL_REQUIRED",
                "Contact email is required if you allow follow-up.",
            )),
            Some(email) if !looks_like_email(email) => issues.push(ValidationIssue::new(
                "contactEmail",
                "VALIDATION_CONTACT_EMAIL_INVALID",
                "Contact email is not a valid email address.",
            )),
            Some(_) => {}
        }
    }

    let submitter = submitter.map(str::trim).filter(|s| !s.is_empty());
    if !sub.is_anonymous && submitter.is_none() {
        issues.push(ValidationIssue::new(
            "isAnonymous",
            "VALIDATION_SUBMITTER_REQUIRED",
            "Sign in to submit a named report, or submit anonymously.",
        ));
    }

    if !issues.is_empty() {
        return Ok(Err(issues));
    }

    let (Some(report_type), Some(date_time)) = (report_type, date_time) else {
        return Ok(Err(issues));
    };

    Ok(Ok(NewIncident {
        report_type,
        title: sub.title.trim().to_string(),
        description: sub.description.trim().to_string(),
        location_text: sub.location_text.trim().to_string(),
        date_time: format_rfc3339_utc(date_time)?,
        allow_follow_up: sub.allow_follow_up,
        contact_email: if wants_contact {
            contact_email.map(str::to_string)
        } else {
            None
        },
        is_anonymous: sub.is_anonymous,
        created_by_user_id: if sub.is_anonymous {
            None
        } else {
            submitter.map(str::to_string)
        },
    }))
}

/// [`check_submission`] with the issue list folded into a single `VALIDATION_FAILED` error.
pub fn validate_submission(
    sub: &IncidentSubmission,
    submitter: Option<&str>,
    now: &str,
) -> Result<NewIncident, AppError> {
    match check_submission(sub, submitter, now)? {
        Ok(incident) => Ok(incident),
        Err(issues) => Err(issues_to_error(&issues)),
    }
}

pub fn issues_to_error(issues: &[ValidationIssue]) -> AppError {
    let message = issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let err = AppError::new("VALIDATION_FAILED", message);
    match serde_json::to_string(issues) {
        Ok(json) => err.with_details(json),
        Err(_) => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(looks_like_email("first.last@campus.example.edu"));
        assert!(!looks_like_email("no-at-sign.example"));
        assert!(!looks_like_email("a@nodot"));
        assert!(!looks_like_email("a b@c.de"));
        assert!(!looks_like_email("@c.de"));
        assert!(!looks_like_email("a@b@c.de"));
    }
}
