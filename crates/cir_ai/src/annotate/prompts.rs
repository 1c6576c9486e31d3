use cir_core::domain::ReportType;

pub const CLASSIFY_TEMPLATE_VERSION: &str = "classify_incident_v1";
pub const RISK_TEMPLATE_VERSION: &str = "estimate_risk_v1";
pub const SUMMARY_TEMPLATE_VERSION: &str = "summarize_description_v1";

fn category_list() -> String {
    let labels: Vec<&str> = ReportType::ALL.iter().map(|t| t.as_str()).collect();
    match labels.split_last() {
        Some((last, rest)) => format!("{}, or {}", rest.join(", "), last),
        None => String::new(),
    }
}

pub fn classify_prompt(description: &str) -> String {
    format!(
        r#"You are an AI assistant specializing in classifying incident reports.
Given the incident description, classify the incident into one of the following categories: {categories}.
Return ONLY the category name, as JSON: {{"aiCategory": "<category>"}}.

Incident Description: {description}
"#,
        categories = category_list(),
    )
}

pub fn risk_prompt(title: &str, description: &str) -> String {
    format!(
        r#"You are an AI assistant that estimates the risk level of safety incidents.

Based on the title and description of the incident, determine the risk level.

The risk levels are: Low, Medium, High, Critical.
Answer as JSON: {{"aiRiskLevel": "<level>"}}.

Title: {title}
Description: {description}

Risk Level:"#
    )
}

pub fn summary_prompt(description: &str) -> String {
    format!(
        r#"Summarize the following incident description in 2-3 lines.
Answer as JSON: {{"summary": "<summary>"}}.

{description}
"#
    )
}
