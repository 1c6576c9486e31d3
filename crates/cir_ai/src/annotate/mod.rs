use cir_core::domain::RiskLevel;
use cir_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::llm::Llm;

pub mod prompts;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyOutput {
    pub ai_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RiskOutput {
    pub ai_risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryOutput {
    pub summary: String,
}

pub fn classify_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { "aiCategory": { "type": "string" } },
        "required": ["aiCategory"]
    })
}

pub fn risk_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "aiRiskLevel": { "type": "string", "enum": ["Low", "Medium", "High", "Critical"] }
        },
        "required": ["aiRiskLevel"]
    })
}

pub fn summary_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { "summary": { "type": "string" } },
        "required": ["summary"]
    })
}

/// Parse a model reply against its declared output type. Anything that does not fit fails whole.
pub fn parse_structured<T: DeserializeOwned>(operation: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw.trim()).map_err(|e| {
        AppError::new(
            "AI_SCHEMA_INVALID",
            format!("Model output for {operation} did not match its schema"),
        )
        .with_details(format!("err={e}; output={raw}"))
    })
}

/// Ask the model which report type the description reads as.
///
/// The label is returned as the model gave it (trimmed); it is not checked against the
/// report-type list.
pub fn classify_incident(llm: &dyn Llm, model: &str, description: &str) -> Result<String, AppError> {
    tracing::debug!(model, template = prompts::CLASSIFY_TEMPLATE_VERSION, "classifying incident");
    let raw = llm.generate(model, &prompts::classify_prompt(description), &classify_schema())?;
    let out: ClassifyOutput = parse_structured("classify", &raw)?;
    Ok(out.ai_category.trim().to_string())
}

pub fn estimate_risk_level(
    llm: &dyn Llm,
    model: &str,
    title: &str,
    description: &str,
) -> Result<RiskLevel, AppError> {
    tracing::debug!(model, template = prompts::RISK_TEMPLATE_VERSION, "estimating risk level");
    let raw = llm.generate(model, &prompts::risk_prompt(title, description), &risk_schema())?;
    let out: RiskOutput = parse_structured("estimate_risk", &raw)?;
    Ok(out.ai_risk_level)
}

pub fn summarize_description(
    llm: &dyn Llm,
    model: &str,
    description: &str,
) -> Result<String, AppError> {
    tracing::debug!(model, template = prompts::SUMMARY_TEMPLATE_VERSION, "summarizing description");
    let raw = llm.generate(model, &prompts::summary_prompt(description), &summary_schema())?;
    let out: SummaryOutput = parse_structured("summarize", &raw)?;
    Ok(out.summary.trim().to_string())
}
