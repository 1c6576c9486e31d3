use serde::{Deserialize, Serialize};

use crate::domain::{
    Incident, IncidentFilters, ReportStatus, RiskLevel, SortKey, ValidationIssue,
};
use crate::error::AppError;
use crate::repo::{get_all, IncidentStore};
use crate::validate::issues_to_error;

/// Dashboard parameters as they arrive from the URL (`?status=&risk=&category=&sort=&q=`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub risk: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub q: Option<String>,
}

/// Store-level arguments for [`get_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub filters: IncidentFilters,
    pub sort: SortKey,
    pub search: String,
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl DashboardQuery {
    /// Empty values and `all` mean "no filter". Unknown sort keys fall back to newest first.
    pub fn resolve(&self) -> Result<ResolvedQuery, AppError> {
        let mut issues = Vec::new();

        let status = match active(&self.status) {
            Some(s) => {
                let parsed = ReportStatus::parse(s);
                if parsed.is_none() {
                    issues.push(ValidationIssue::new(
                        "status",
                        "VALIDATION_FILTER_INVALID",
                        format!("Unknown status filter: {s}"),
                    ));
                }
                parsed
            }
            None => None,
        };

        let risk_level = match active(&self.risk) {
            Some(s) => {
                let parsed = RiskLevel::parse(s);
                if parsed.is_none() {
                    issues.push(ValidationIssue::new(
                        "risk",
                        "VALIDATION_FILTER_INVALID",
                        format!("Unknown risk filter: {s}"),
                    ));
                }
                parsed
            }
            None => None,
        };

        if !issues.is_empty() {
            let mut err = issues_to_error(&issues);
            err.code = "VALIDATION_FILTER_INVALID".to_string();
            return Err(err);
        }

        let sort = match active(&self.sort) {
            Some("oldest") => SortKey::Oldest,
            Some("risk") => SortKey::Risk,
            _ => SortKey::Newest,
        };

        Ok(ResolvedQuery {
            filters: IncidentFilters {
                status,
                risk_level,
                category: active(&self.category).map(str::to_string),
            },
            sort,
            search: self.q.clone().unwrap_or_default(),
        })
    }
}

pub fn run_dashboard_query(
    store: &dyn IncidentStore,
    query: &DashboardQuery,
) -> Result<Vec<Incident>, AppError> {
    let resolved = query.resolve()?;
    get_all(store, &resolved.filters, resolved.sort, &resolved.search)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(status: &str, risk: &str, category: &str, sort: &str, text: &str) -> DashboardQuery {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        DashboardQuery {
            status: opt(status),
            risk: opt(risk),
            category: opt(category),
            sort: opt(sort),
            q: opt(text),
        }
    }

    #[test]
    fn empty_and_all_mean_unfiltered() {
        let r = q("all", "", "ALL", "", "").resolve().expect("resolve");
        assert_eq!(r, ResolvedQuery::default());
    }

    #[test]
    fn translates_filters_and_sort() {
        let r = q("Under Review", "High", "theft", "risk", "bike")
            .resolve()
            .expect("resolve");
        assert_eq!(r.filters.status, Some(ReportStatus::UnderReview));
        assert_eq!(r.filters.risk_level, Some(RiskLevel::High));
        assert_eq!(r.filters.category.as_deref(), Some("theft"));
        assert_eq!(r.sort, SortKey::Risk);
        assert_eq!(r.search, "bike");
    }

    #[test]
    fn unknown_sort_falls_back_to_newest() {
        let r = q("", "", "", "alphabetical", "").resolve().expect("resolve");
        assert_eq!(r.sort, SortKey::Newest);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = q("Archived", "Severe", "", "", "").resolve().expect_err("invalid");
        assert_eq!(err.code, "VALIDATION_FILTER_INVALID");
        assert!(err.details.unwrap_or_default().contains("risk"));
    }
}
