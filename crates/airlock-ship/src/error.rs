//! Error types for the ship crate.

use airlock_types::{RoomId, SabotageKind};
use thiserror::Error;

/// Errors raised while building or querying the ship map.
#[derive(Debug, Error)]
pub enum ShipError {
    /// A room name referenced in config does not exist.
    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// The same room name appears twice in the config.
    #[error("duplicate room: {0}")]
    DuplicateRoom(String),

    /// A room id is outside the interned range.
    #[error("room id out of range: {0}")]
    RoomOutOfRange(RoomId),

    /// No fix room is configured for a sabotage kind.
    #[error("no fix room configured for sabotage {0}")]
    MissingFixRoom(SabotageKind),

    /// The task catalog references a room missing from the map.
    #[error("task {task:?} is bound to unknown room {room:?}")]
    TaskRoomUnknown {
        /// Task name from the catalog.
        task: String,
        /// The unresolvable room name.
        room: String,
    },
}
