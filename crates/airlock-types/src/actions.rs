//! The typed action union submitted by agents and resolved by the engine.
//!
//! Actions are a tagged union so the engine gets compile-time exhaustiveness
//! in its legality and resolution code. The LLM-facing side works on rendered
//! strings (`LegalAction::repr`) because model output is textual; the parser
//! maps matched strings back to the typed variant by index.

use serde::{Deserialize, Serialize};

use crate::enums::SabotageKind;
use crate::ids::{PlayerId, RoomId, TaskId};

/// A ballot cast during the voting sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    /// Vote to eject the named living player.
    Player(PlayerId),
    /// Abstain.
    Skip,
}

/// One concrete action instance an agent can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Walk to an adjacent room (ghosts: any room).
    Move {
        /// Destination room.
        to: RoomId,
    },
    /// Impostor-only teleport through the vent network.
    Vent {
        /// Destination room.
        to: RoomId,
    },
    /// Advance an assigned task by one turn while in its room.
    CompleteTask {
        /// The task being worked.
        task: TaskId,
    },
    /// Impostor cover behavior: pretend to work a non-visual task.
    CompleteFakeTask {
        /// The task being faked.
        task: TaskId,
    },
    /// Impostor-only kill of a co-located crewmate.
    Kill {
        /// The victim.
        victim: PlayerId,
    },
    /// Impostor-only: trigger a ship system sabotage.
    Sabotage {
        /// Which system to sabotage.
        kind: SabotageKind,
    },
    /// Repair an active sabotage from its designated fix room.
    FixSabotage {
        /// Which active sabotage to repair.
        kind: SabotageKind,
    },
    /// Press the emergency button in the Cafeteria.
    CallMeeting,
    /// Report an unreported dead body in the current room.
    ReportBody,
    /// Say something during a discussion round.
    Speak {
        /// The public utterance.
        message: String,
    },
    /// Cast a ballot during the voting sub-phase.
    Vote {
        /// The chosen target, or skip.
        choice: VoteChoice,
    },
    /// Check the security monitor for a chosen room (Security only).
    ViewMonitor {
        /// The room under observation.
        room: RoomId,
    },
}

/// Discriminant of [`Action`], used for name-level matching in the parser
/// and the phase/ghost guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    /// See [`Action::Move`].
    Move,
    /// See [`Action::Vent`].
    Vent,
    /// See [`Action::CompleteTask`].
    CompleteTask,
    /// See [`Action::CompleteFakeTask`].
    CompleteFakeTask,
    /// See [`Action::Kill`].
    Kill,
    /// See [`Action::Sabotage`].
    Sabotage,
    /// See [`Action::FixSabotage`].
    FixSabotage,
    /// See [`Action::CallMeeting`].
    CallMeeting,
    /// See [`Action::ReportBody`].
    ReportBody,
    /// See [`Action::Speak`].
    Speak,
    /// See [`Action::Vote`].
    Vote,
    /// See [`Action::ViewMonitor`].
    ViewMonitor,
}

impl ActionKind {
    /// The action name as it appears in prompts and log lines.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Move => "MOVE",
            Self::Vent => "VENT",
            Self::CompleteTask => "COMPLETE TASK",
            Self::CompleteFakeTask => "COMPLETE FAKE TASK",
            Self::Kill => "KILL",
            Self::Sabotage => "SABOTAGE",
            Self::FixSabotage => "FIX SABOTAGE",
            Self::CallMeeting => "CALL MEETING",
            Self::ReportBody => "REPORT DEAD BODY",
            Self::Speak => "SPEAK",
            Self::Vote => "VOTE",
            Self::ViewMonitor => "VIEW MONITOR",
        }
    }

    /// Whether the action resolves in the movement stage of the tick.
    pub const fn is_movement(self) -> bool {
        matches!(self, Self::Move | Self::Vent)
    }

    /// Whether the action transitions the game into the meeting phase.
    pub const fn triggers_meeting(self) -> bool {
        matches!(self, Self::CallMeeting | Self::ReportBody)
    }

    /// Whether a dead player may perform this action.
    ///
    /// Ghosts keep helping the crew: movement (no-clip) and task work only.
    pub const fn ghost_allowed(self) -> bool {
        matches!(self, Self::Move | Self::CompleteTask | Self::CompleteFakeTask)
    }
}

impl Action {
    /// The discriminant of this action.
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Move { .. } => ActionKind::Move,
            Self::Vent { .. } => ActionKind::Vent,
            Self::CompleteTask { .. } => ActionKind::CompleteTask,
            Self::CompleteFakeTask { .. } => ActionKind::CompleteFakeTask,
            Self::Kill { .. } => ActionKind::Kill,
            Self::Sabotage { .. } => ActionKind::Sabotage,
            Self::FixSabotage { .. } => ActionKind::FixSabotage,
            Self::CallMeeting => ActionKind::CallMeeting,
            Self::ReportBody => ActionKind::ReportBody,
            Self::Speak { .. } => ActionKind::Speak,
            Self::Vote { .. } => ActionKind::Vote,
            Self::ViewMonitor { .. } => ActionKind::ViewMonitor,
        }
    }

    /// Movement destination, if this is a MOVE or VENT.
    pub const fn destination(&self) -> Option<RoomId> {
        match self {
            Self::Move { to } | Self::Vent { to } => Some(*to),
            _ => None,
        }
    }
}
