pub mod annotate;
pub mod llm;
pub mod ollama;
pub mod pipeline;
