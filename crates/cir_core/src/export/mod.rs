use crate::domain::Incident;
use crate::error::AppError;
use crate::query::{run_dashboard_query, DashboardQuery};
use crate::repo::IncidentStore;

pub const CSV_HEADER: [&str; 10] = [
    "id",
    "created_at",
    "report_type",
    "title",
    "status",
    "ai_risk_level",
    "ai_category",
    "location",
    "incident_at",
    "is_anonymous",
];

/// Render incidents as CSV in the given order. Contact details and free-text bodies are left out.
pub fn incidents_to_csv(incidents: &[Incident]) -> Result<String, AppError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    let write_err = |e: csv::Error| {
        AppError::new("EXPORT_CSV_FAILED", "Failed to write CSV row").with_details(e.to_string())
    };

    wtr.write_record(CSV_HEADER).map_err(write_err)?;
    for inc in incidents {
        let id = inc.id.to_string();
        wtr.write_record([
            id.as_str(),
            inc.created_at.as_str(),
            inc.report_type.as_str(),
            inc.title.as_str(),
            inc.status.as_str(),
            inc.ai_risk_level.map(|r| r.as_str()).unwrap_or(""),
            inc.ai_category.as_deref().unwrap_or(""),
            inc.location_text.as_str(),
            inc.date_time.as_str(),
            if inc.is_anonymous { "true" } else { "false" },
        ])
        .map_err(write_err)?;
    }

    let bytes = wtr.into_inner().map_err(|e| {
        AppError::new("EXPORT_CSV_FAILED", "Failed to flush CSV output")
            .with_details(e.to_string())
    })?;
    String::from_utf8(bytes).map_err(|e| {
        AppError::new("EXPORT_CSV_FAILED", "CSV output was not UTF-8").with_details(e.to_string())
    })
}

/// Export exactly what the dashboard shows for `query`.
pub fn export_dashboard_csv(
    store: &dyn IncidentStore,
    query: &DashboardQuery,
) -> Result<String, AppError> {
    let incidents = run_dashboard_query(store, query)?;
    incidents_to_csv(&incidents)
}
