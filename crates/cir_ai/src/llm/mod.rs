use cir_core::error::AppError;

/// A single-round-trip text model.
///
/// `format` is the JSON schema the reply must follow. Implementations return the raw reply
/// text; callers parse and validate it.
pub trait Llm: Send + Sync {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        format: &serde_json::Value,
    ) -> Result<String, AppError>;
}

pub mod ollama_llm;
