use time::format_description::well_known::Rfc3339;
use time::macros::datetime;
use time::{format_description, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::AppError;

/// Earliest incident date the intake form accepts.
pub const INCIDENT_DATE_FLOOR: OffsetDateTime = datetime!(1900-01-01 0:00 UTC);

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("TIME_FORMAT_FAILED", "Failed to format current time")
            .with_details(e.to_string())
    })
}

pub fn format_rfc3339_utc(dt: OffsetDateTime) -> Result<String, AppError> {
    dt.to_offset(UtcOffset::UTC).format(&Rfc3339).map_err(|e| {
        AppError::new("TIME_FORMAT_FAILED", "Failed to format timestamp")
            .with_details(e.to_string())
    })
}

pub fn parse_rfc3339(field: &str, value: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| {
        AppError::new("TIME_PARSE_FAILED", format!("Failed to parse {field}"))
            .with_details(format!("value={value}; err={e}"))
    })
}

/// Parse a user-provided incident date.
///
/// RFC3339 is preferred. Browser `datetime-local` values carry no offset and are read as UTC.
pub fn parse_incident_datetime(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt.to_offset(UtcOffset::UTC));
    }

    for fmt in [
        "[year]-[month]-[day]T[hour]:[minute]:[second]",
        "[year]-[month]-[day]T[hour]:[minute]",
        "[year]-[month]-[day] [hour]:[minute]",
    ] {
        let Ok(items) = format_description::parse(fmt) else {
            continue;
        };
        if let Ok(pdt) = PrimitiveDateTime::parse(raw, &items) {
            return Some(pdt.assume_utc());
        }
    }

    None
}
