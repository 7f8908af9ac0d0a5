//! Error types for the engine crate.

use thiserror::Error;

use crate::decision::DecisionError;

/// Errors that can abort a tick or game initialization.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A ship-map operation failed.
    #[error("ship error: {source}")]
    Ship {
        /// The underlying map error.
        #[from]
        source: airlock_ship::ShipError,
    },

    /// A player-state operation failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: airlock_agents::AgentError,
    },

    /// The decision source failed entirely.
    #[error("decision error: {source}")]
    Decision {
        /// The underlying decision error.
        #[from]
        source: DecisionError,
    },

    /// A log record could not be written.
    #[error("event log error: {source}")]
    Events {
        /// The underlying log error.
        #[from]
        source: airlock_events::EventError,
    },

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}
