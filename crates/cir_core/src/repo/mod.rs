use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::domain::{
    risk_rank, AnnotationStatus, Incident, IncidentFilters, IncidentPatch, NewIncident,
    ReportStatus, ReportType, RiskLevel, SortKey,
};
use crate::error::AppError;

/// Creation-time order the store can apply natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedOrder {
    NewestFirst,
    OldestFirst,
}

/// Document store for incident records.
///
/// Implementations own persistence only: they stamp `updated_at` but never check
/// cross-field invariants (that is the submission pipeline's job).
pub trait IncidentStore {
    /// Insert a new record with status `New`, no attachments and no annotation. Returns its id.
    fn create_incident(&self, incident: &NewIncident, now: &str) -> Result<i64, AppError>;

    /// Merge `patch` into the stored record and stamp `updated_at = now`.
    fn update_incident_fields(
        &self,
        id: i64,
        patch: &IncidentPatch,
        now: &str,
    ) -> Result<(), AppError>;

    fn get_incident(&self, id: i64) -> Result<Option<Incident>, AppError>;

    /// Records owned by `user_id`, newest first.
    fn list_incidents_for_owner(&self, user_id: &str) -> Result<Vec<Incident>, AppError>;

    /// Equality-filtered scan ordered by creation time.
    fn list_incidents(
        &self,
        filters: &IncidentFilters,
        order: CreatedOrder,
    ) -> Result<Vec<Incident>, AppError>;
}

const INCIDENT_COLUMNS: &str = r#"
        id, report_type, title, description, location_text, date_time,
        allow_follow_up, contact_email, is_anonymous, created_by_user_id, attachments_json,
        ai_category, ai_risk_level, ai_summary, ai_status, ai_error,
        status, admin_notes, created_at, updated_at
"#;

fn conversion_error(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn incident_from_row(row: &Row<'_>) -> rusqlite::Result<Incident> {
    let report_type: String = row.get(1)?;
    let report_type = ReportType::parse(&report_type).ok_or_else(|| {
        conversion_error(
            1,
            AppError::new("DB_DECODE_FAILED", "Unknown report_type")
                .with_details(format!("value={report_type}")),
        )
    })?;

    let attachments_json: String = row.get(10)?;
    let attachments: Vec<String> = serde_json::from_str(&attachments_json).map_err(|e| {
        conversion_error(
            10,
            AppError::new("DB_DECODE_FAILED", "Failed to decode attachments")
                .with_details(e.to_string()),
        )
    })?;

    let ai_risk_level: Option<String> = row.get(12)?;
    let ai_risk_level = match ai_risk_level {
        Some(s) => Some(RiskLevel::parse(&s).ok_or_else(|| {
            conversion_error(
                12,
                AppError::new("DB_DECODE_FAILED", "Unknown ai_risk_level")
                    .with_details(format!("value={s}")),
            )
        })?),
        None => None,
    };

    let ai_status: String = row.get(14)?;
    let ai_status = AnnotationStatus::parse(&ai_status).ok_or_else(|| {
        conversion_error(
            14,
            AppError::new("DB_DECODE_FAILED", "Unknown ai_status")
                .with_details(format!("value={ai_status}")),
        )
    })?;

    let status: String = row.get(16)?;
    let status = ReportStatus::parse(&status).ok_or_else(|| {
        conversion_error(
            16,
            AppError::new("DB_DECODE_FAILED", "Unknown status")
                .with_details(format!("value={status}")),
        )
    })?;

    Ok(Incident {
        id: row.get(0)?,
        report_type,
        title: row.get(2)?,
        description: row.get(3)?,
        location_text: row.get(4)?,
        date_time: row.get(5)?,
        allow_follow_up: row.get(6)?,
        contact_email: row.get(7)?,
        is_anonymous: row.get(8)?,
        created_by_user_id: row.get(9)?,
        attachments,
        ai_category: row.get(11)?,
        ai_risk_level,
        ai_summary: row.get(13)?,
        ai_status,
        ai_error: row.get(15)?,
        status,
        admin_notes: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

fn query_incidents(
    conn: &Connection,
    sql: &str,
    values: &[Value],
) -> Result<Vec<Incident>, AppError> {
    let mut stmt = conn.prepare(sql).map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to prepare incidents query")
            .with_details(e.to_string())
    })?;

    let rows = stmt
        .query_map(params_from_iter(values.iter()), incident_from_row)
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query incidents")
                .with_details(e.to_string())
        })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to decode incident row")
                .with_details(e.to_string())
        })?);
    }

    Ok(out)
}

pub fn create_incident(
    conn: &Connection,
    incident: &NewIncident,
    now: &str,
) -> Result<i64, AppError> {
    conn.execute(
        r#"
      INSERT INTO incidents(
        report_type, title, description, location_text, date_time,
        allow_follow_up, contact_email, is_anonymous, created_by_user_id,
        attachments_json, status, ai_status, created_at, updated_at
      ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, '[]', ?10, ?11, ?12, ?12)
      "#,
        params![
            incident.report_type.as_str(),
            incident.title,
            incident.description,
            incident.location_text,
            incident.date_time,
            incident.allow_follow_up,
            incident.contact_email,
            incident.is_anonymous,
            incident.created_by_user_id,
            ReportStatus::New.as_str(),
            AnnotationStatus::Pending.as_str(),
            now,
        ],
    )
    .map_err(|e| {
        AppError::new("DB_WRITE_FAILED", "Failed to insert incident")
            .with_details(e.to_string())
            .with_retryable(true)
    })?;

    // The row id is the identifier column itself, so no follow-up write is needed to expose it.
    Ok(conn.last_insert_rowid())
}

pub fn update_incident_fields(
    conn: &Connection,
    id: i64,
    patch: &IncidentPatch,
    now: &str,
) -> Result<(), AppError> {
    let mut columns: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(attachments) = &patch.attachments {
        let json = serde_json::to_string(attachments).map_err(|e| {
            AppError::new("DB_WRITE_FAILED", "Failed to encode attachments")
                .with_details(e.to_string())
        })?;
        columns.push("attachments_json");
        values.push(Value::Text(json));
    }
    if let Some(v) = &patch.ai_category {
        columns.push("ai_category");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = patch.ai_risk_level {
        columns.push("ai_risk_level");
        values.push(Value::Text(v.as_str().to_string()));
    }
    if let Some(v) = &patch.ai_summary {
        columns.push("ai_summary");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = patch.ai_status {
        columns.push("ai_status");
        values.push(Value::Text(v.as_str().to_string()));
    }
    if let Some(v) = &patch.ai_error {
        columns.push("ai_error");
        values.push(Value::Text(v.clone()));
    }
    if let Some(v) = patch.status {
        columns.push("status");
        values.push(Value::Text(v.as_str().to_string()));
    }
    if let Some(v) = &patch.admin_notes {
        columns.push("admin_notes");
        values.push(Value::Text(v.clone()));
    }
    columns.push("updated_at");
    values.push(Value::Text(now.to_string()));

    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{col} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    values.push(Value::Integer(id));
    let sql = format!(
        "UPDATE incidents SET {assignments} WHERE id = ?{}",
        values.len()
    );

    let changed = conn
        .execute(&sql, params_from_iter(values.iter()))
        .map_err(|e| {
            AppError::new("DB_WRITE_FAILED", "Failed to update incident")
                .with_details(format!("id={id}; err={e}"))
                .with_retryable(true)
        })?;

    if changed == 0 {
        return Err(AppError::new("DB_NOT_FOUND", "Incident not found")
            .with_details(format!("id={id}")));
    }

    Ok(())
}

pub fn get_incident(conn: &Connection, id: i64) -> Result<Option<Incident>, AppError> {
    let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1");
    let mut stmt = conn.prepare(&sql).map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to prepare incident query")
            .with_details(e.to_string())
    })?;

    stmt.query_row([id], incident_from_row)
        .optional()
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to read incident")
                .with_details(format!("id={id}; err={e}"))
        })
}

/// Like [`get_incident`] but a missing record is an error.
pub fn require_incident(store: &dyn IncidentStore, id: i64) -> Result<Incident, AppError> {
    store.get_incident(id)?.ok_or_else(|| {
        AppError::new("DB_NOT_FOUND", "Incident not found").with_details(format!("id={id}"))
    })
}

pub fn list_incidents_for_owner(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<Incident>, AppError> {
    let sql = format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE created_by_user_id = ?1 ORDER BY created_at DESC, id DESC"
    );
    query_incidents(conn, &sql, &[Value::Text(user_id.to_string())])
}

pub fn list_incidents(
    conn: &Connection,
    filters: &IncidentFilters,
    order: CreatedOrder,
) -> Result<Vec<Incident>, AppError> {
    let mut predicates: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(status) = filters.status {
        values.push(Value::Text(status.as_str().to_string()));
        predicates.push(format!("status = ?{}", values.len()));
    }
    if let Some(risk) = filters.risk_level {
        values.push(Value::Text(risk.as_str().to_string()));
        predicates.push(format!("ai_risk_level = ?{}", values.len()));
    }
    if let Some(category) = &filters.category {
        values.push(Value::Text(category.clone()));
        predicates.push(format!("ai_category = ?{}", values.len()));
    }

    let where_clause = if predicates.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", predicates.join(" AND "))
    };
    let order_clause = match order {
        CreatedOrder::NewestFirst => "ORDER BY created_at DESC, id DESC",
        CreatedOrder::OldestFirst => "ORDER BY created_at ASC, id ASC",
    };

    let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents {where_clause} {order_clause}");
    query_incidents(conn, &sql, &values)
}

pub fn count_incidents(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to count incidents")
                .with_details(e.to_string())
        })
}

impl IncidentStore for Connection {
    fn create_incident(&self, incident: &NewIncident, now: &str) -> Result<i64, AppError> {
        create_incident(self, incident, now)
    }

    fn update_incident_fields(
        &self,
        id: i64,
        patch: &IncidentPatch,
        now: &str,
    ) -> Result<(), AppError> {
        update_incident_fields(self, id, patch, now)
    }

    fn get_incident(&self, id: i64) -> Result<Option<Incident>, AppError> {
        get_incident(self, id)
    }

    fn list_incidents_for_owner(&self, user_id: &str) -> Result<Vec<Incident>, AppError> {
        list_incidents_for_owner(self, user_id)
    }

    fn list_incidents(
        &self,
        filters: &IncidentFilters,
        order: CreatedOrder,
    ) -> Result<Vec<Incident>, AppError> {
        list_incidents(self, filters, order)
    }
}

/// Staff status change. Any status may follow any other; concurrent edits are last-write-wins.
pub fn update_incident_status(
    store: &dyn IncidentStore,
    id: i64,
    status: ReportStatus,
    admin_notes: &str,
    now: &str,
) -> Result<Incident, AppError> {
    let patch = IncidentPatch {
        status: Some(status),
        admin_notes: Some(admin_notes.to_string()),
        ..IncidentPatch::default()
    };
    store.update_incident_fields(id, &patch, now).map_err(|e| {
        tracing::error!(incident_id = id, error = %e, "status update failed");
        e
    })?;
    tracing::info!(incident_id = id, status = status.as_str(), "incident status updated");
    require_incident(store, id)
}

/// Filtered, sorted, optionally text-searched view over every incident.
///
/// Equality filters and creation order go to the store. The search is an in-memory,
/// case-insensitive substring match over title and description, applied to the filtered
/// set. Risk order is a stable in-memory sort over the newest-first scan, so records of
/// equal rank stay newest first.
pub fn get_all(
    store: &dyn IncidentStore,
    filters: &IncidentFilters,
    sort: SortKey,
    search: &str,
) -> Result<Vec<Incident>, AppError> {
    let order = match sort {
        SortKey::Oldest => CreatedOrder::OldestFirst,
        SortKey::Newest | SortKey::Risk => CreatedOrder::NewestFirst,
    };
    let mut incidents = store.list_incidents(filters, order)?;

    if !search.is_empty() {
        let needle = search.to_lowercase();
        incidents.retain(|i| {
            i.title.to_lowercase().contains(&needle)
                || i.description.to_lowercase().contains(&needle)
        });
    }

    if sort == SortKey::Risk {
        incidents.sort_by(|a, b| risk_rank(b.ai_risk_level).cmp(&risk_rank(a.ai_risk_level)));
    }

    Ok(incidents)
}
