//! Write-only log records emitted by the Airlock engine.
//!
//! Three record families cross the engine boundary as line-delimited JSON:
//!
//! - [`ActivityRecord`] -- one line per resolved action, with a game-state
//!   snapshot for post-hoc analysis
//! - [`InteractionRecord`] -- one line per LLM decision, with the full
//!   prompt and response for replay and evaluation
//! - [`GameSummary`] -- one line per finished game
//!
//! The engine never reads these back; downstream analysis (critic, rewards,
//! hallucination judging) consumes them as pure functions over the log.

pub mod records;
pub mod writer;

pub use records::{
    ActivityRecord, GameSummary, InteractionRecord, LlmInteraction, PlayerSummary, StateSnapshot,
};
pub use writer::{EventError, JsonlWriter};
