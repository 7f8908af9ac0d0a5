//! Error types for the runner crate.

use thiserror::Error;

/// Errors raised while producing an LLM decision.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The HTTP call to the LLM backend failed or returned an unusable body.
    #[error("llm backend error: {0}")]
    LlmBackend(String),

    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// The response could not be resolved to a legal action.
    #[error("parse error: {0}")]
    Parse(String),
}
