//! Shared type definitions for the Airlock simulation.
//!
//! This crate is the single source of truth for the vocabulary used across
//! the Airlock workspace: identifiers, enumerations, the typed action union,
//! core entity structs, and the perception payload handed to deciders.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe index wrappers for players, rooms, and tasks
//! - [`enums`] -- Enumeration types (roles, phases, sabotage, meetings)
//! - [`actions`] -- The typed action union and its discriminants
//! - [`structs`] -- Tasks, dead bodies, and the game configuration
//! - [`perception`] -- The filtered world view delivered per decision

pub mod actions;
pub mod enums;
pub mod ids;
pub mod perception;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, ActionKind, VoteChoice};
pub use enums::{
    CrisisRole, DeathCause, Intent, MeetingRole, MeetingStage, ObservationKind, Phase, Role,
    SabotageKind, TaskKind, Winner,
};
pub use ids::{PlayerId, RoomId, TaskId};
pub use perception::{
    AdjacencyLine, DeceptionLedger, FakeMemoryEntry, HearsayEntry, LegalAction, MapBrief,
    MeetingContext, MemoryView, OwnClaim, Perception, PresenceEntry, RoomView, RosterEntry,
    SelfView, TaskStatus, TaskView, VerifiedObservation,
};
pub use structs::{DeadBody, GameConfig, Task};
