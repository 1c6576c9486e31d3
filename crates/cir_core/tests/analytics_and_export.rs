use cir_core::analytics::{build_analytics, CountBucket};
use cir_core::db;
use cir_core::domain::{IncidentPatch, NewIncident, ReportStatus, ReportType, RiskLevel};
use cir_core::export::{export_dashboard_csv, CSV_HEADER};
use cir_core::query::DashboardQuery;
use cir_core::repo::{create_incident, update_incident_fields};
use pretty_assertions::assert_eq;
use rusqlite::Connection;

fn seeded() -> Connection {
    let mut conn = db::open_in_memory().expect("open");
    db::migrate(&mut conn).expect("migrate");

    let rows: [(&str, ReportStatus, Option<RiskLevel>, Option<&str>); 5] = [
        ("Phone stolen, \"urgent\"", ReportStatus::New, Some(RiskLevel::High), Some("theft")),
        ("Broken light", ReportStatus::UnderReview, Some(RiskLevel::Low), Some("infrastructure issue")),
        ("Threatening note", ReportStatus::New, Some(RiskLevel::Critical), Some("harassment")),
        ("Graffiti", ReportStatus::Closed, Some(RiskLevel::Low), Some("vandalism")),
        ("Unannotated", ReportStatus::New, None, None),
    ];

    for (i, (title, status, risk, category)) in rows.into_iter().enumerate() {
        let now = format!("2026-03-01T10:0{i}:00Z");
        let id = create_incident(
            &conn,
            &NewIncident {
                report_type: ReportType::Other,
                title: title.to_string(),
                description: "Details supplied by the reporter.".to_string(),
                location_text: "Campus".to_string(),
                date_time: "2026-03-01T09:00:00Z".to_string(),
                allow_follow_up: false,
                contact_email: None,
                is_anonymous: true,
                created_by_user_id: None,
            },
            &now,
        )
        .expect("create");
        update_incident_fields(
            &conn,
            id,
            &IncidentPatch {
                status: Some(status),
                ai_risk_level: risk,
                ai_category: category.map(str::to_string),
                ..IncidentPatch::default()
            },
            &now,
        )
        .expect("patch");
    }
    conn
}

fn count(buckets: &[CountBucket], name: &str) -> i64 {
    buckets
        .iter()
        .find(|b| b.name == name)
        .map(|b| b.count)
        .unwrap_or_else(|| panic!("missing bucket {name}"))
}

#[test]
fn analytics_counts_every_bucket() {
    let conn = seeded();
    let a = build_analytics(&conn).expect("analytics");

    assert_eq!(a.total_incidents, 5);
    assert_eq!(a.high_or_critical, 2);
    assert_eq!(a.pending_review, 4);

    let status_names: Vec<&str> = a.status_counts.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        status_names,
        vec!["New", "Under Review", "In Progress", "Resolved", "Closed"]
    );
    assert_eq!(count(&a.status_counts, "New"), 3);
    assert_eq!(count(&a.status_counts, "In Progress"), 0);

    assert_eq!(count(&a.risk_counts, "Low"), 2);
    assert_eq!(count(&a.risk_counts, "Medium"), 0);
    assert_eq!(count(&a.risk_counts, "unset"), 1);

    assert_eq!(count(&a.category_counts, "theft"), 1);
    assert_eq!(count(&a.category_counts, "mental health"), 0);
    assert_eq!(count(&a.category_counts, "other labels"), 1);
}

#[test]
fn csv_export_matches_the_dashboard_view() {
    let conn = seeded();
    let query = DashboardQuery {
        status: Some("New".to_string()),
        sort: Some("risk".to_string()),
        ..DashboardQuery::default()
    };
    let csv_text = export_dashboard_csv(&conn, &query).expect("export");

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_text.as_bytes());
    let headers: Vec<String> = rdr.headers().expect("headers").iter().map(String::from).collect();
    assert_eq!(headers, CSV_HEADER.to_vec());

    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.expect("row")).collect();
    let titles: Vec<&str> = rows.iter().map(|r| &r[3]).collect();
    assert_eq!(
        titles,
        vec!["Threatening note", "Phone stolen, \"urgent\"", "Unannotated"]
    );
    assert_eq!(&rows[0][5], "Critical");
    assert_eq!(&rows[2][5], "");
    assert_eq!(&rows[0][9], "true");
}
