//! The LLM decision runner for the Airlock simulation.
//!
//! This crate implements the model-facing half of the engine:
//!
//! - [`llm`] -- enum-dispatch HTTP backends (OpenAI-compatible, Anthropic)
//!   with bounded retries and truncation reporting
//! - [`prompt`] -- the 4-message conversation assembler (system manual,
//!   state injection, fake acknowledgment, action request)
//! - [`briefing`] -- phase-specific prompt addenda (desperation tiers,
//!   kill-risk matrix, meeting stages and roles, truth checks)
//! - [`parse`] -- normalization, tiered action resolution, smart fallback,
//!   truncation recovery, thought-action alignment
//! - [`score`] -- the speaking-score hallucination firewall
//! - [`decider`] -- the [`airlock_core::DecisionSource`] implementation
//!   that fans decisions out in parallel

pub mod briefing;
pub mod decider;
pub mod error;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod score;
pub mod templates;

#[cfg(test)]
pub(crate) mod testutil;

pub use decider::LlmDecisionSource;
pub use error::RunnerError;
pub use llm::{BackendType, ChatMessage, LlmBackend, LlmBackendConfig, LlmResponse, create_backend};
pub use prompt::PromptEngine;
pub use score::{SpeechScorer, compute_valid_truths};
