use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Incident, IncidentFilters, ReportStatus, ReportType, RiskLevel};
use crate::error::AppError;
use crate::repo::{CreatedOrder, IncidentStore};

pub const ANALYTICS_PAYLOAD_VERSION: u32 = 1;

/// Bucket key for incidents with no risk level yet.
pub const UNSET_BUCKET: &str = "unset";
/// Bucket key for model-assigned categories outside the six report types.
pub const OTHER_LABELS_BUCKET: &str = "other labels";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountBucket {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyticsPayload {
    pub version: u32,
    pub total_incidents: i64,
    pub high_or_critical: i64,
    pub pending_review: i64,
    pub status_counts: Vec<CountBucket>,
    pub risk_counts: Vec<CountBucket>,
    pub category_counts: Vec<CountBucket>,
}

fn bucket(counts: &BTreeMap<String, i64>, name: &str) -> CountBucket {
    CountBucket {
        name: name.to_string(),
        count: counts.get(name).copied().unwrap_or(0),
    }
}

pub fn build_analytics_from(incidents: &[Incident]) -> AnalyticsPayload {
    let mut status_map: BTreeMap<String, i64> = BTreeMap::new();
    let mut risk_map: BTreeMap<String, i64> = BTreeMap::new();
    let mut category_map: BTreeMap<String, i64> = BTreeMap::new();

    for inc in incidents {
        *status_map.entry(inc.status.as_str().to_string()).or_default() += 1;

        let risk_key = inc
            .ai_risk_level
            .map(|r| r.as_str())
            .unwrap_or(UNSET_BUCKET);
        *risk_map.entry(risk_key.to_string()).or_default() += 1;

        // Categories are free-form model output; only exact report-type labels get their own bucket.
        if let Some(cat) = inc.ai_category.as_deref() {
            let key = if ReportType::ALL.iter().any(|t| t.as_str() == cat) {
                cat
            } else {
                OTHER_LABELS_BUCKET
            };
            *category_map.entry(key.to_string()).or_default() += 1;
        }
    }

    let status_counts: Vec<CountBucket> = ReportStatus::ALL
        .iter()
        .map(|s| bucket(&status_map, s.as_str()))
        .collect();

    let mut risk_counts: Vec<CountBucket> = RiskLevel::ALL
        .iter()
        .map(|r| bucket(&risk_map, r.as_str()))
        .collect();
    risk_counts.push(bucket(&risk_map, UNSET_BUCKET));

    let mut category_counts: Vec<CountBucket> = ReportType::ALL
        .iter()
        .map(|t| bucket(&category_map, t.as_str()))
        .collect();
    category_counts.push(bucket(&category_map, OTHER_LABELS_BUCKET));

    let count_of = |buckets: &[CountBucket], name: &str| {
        buckets
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.count)
            .unwrap_or(0)
    };

    AnalyticsPayload {
        version: ANALYTICS_PAYLOAD_VERSION,
        total_incidents: incidents.len() as i64,
        high_or_critical: count_of(&risk_counts, RiskLevel::High.as_str())
            + count_of(&risk_counts, RiskLevel::Critical.as_str()),
        pending_review: count_of(&status_counts, ReportStatus::New.as_str())
            + count_of(&status_counts, ReportStatus::UnderReview.as_str()),
        status_counts,
        risk_counts,
        category_counts,
    }
}

pub fn build_analytics(store: &dyn IncidentStore) -> Result<AnalyticsPayload, AppError> {
    let incidents = store.list_incidents(&IncidentFilters::default(), CreatedOrder::NewestFirst)?;
    Ok(build_analytics_from(&incidents))
}
