//! Error types for the agents crate.

use airlock_types::{PlayerId, TaskId};
use thiserror::Error;

/// Errors raised by player-state operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A death transition was attempted on an already-dead player.
    ///
    /// Death metadata is set exactly once; a second transition is a logic
    /// error in the caller.
    #[error("player {0} is already dead")]
    AlreadyDead(PlayerId),

    /// A task id was referenced that the player does not own.
    #[error("player {player} has no task {task}")]
    UnknownTask {
        /// The player whose task list was searched.
        player: PlayerId,
        /// The missing task id.
        task: TaskId,
    },
}
