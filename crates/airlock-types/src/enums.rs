//! Enumeration types shared across the Airlock workspace.

use serde::{Deserialize, Serialize};

/// The hidden allegiance of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Wins by completing tasks or ejecting every impostor.
    Crewmate,
    /// Wins by killing until impostors reach parity, or by timeout.
    Impostor,
}

impl Role {
    /// Return the opposite allegiance.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Crewmate => Self::Impostor,
            Self::Impostor => Self::Crewmate,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Crewmate => write!(f, "Crewmate"),
            Self::Impostor => write!(f, "Impostor"),
        }
    }
}

/// The two phases of the game loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Free movement, tasks, kills, and sabotage.
    Task,
    /// Discussion rounds followed by a vote.
    Meeting,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Meeting => write!(f, "meeting"),
        }
    }
}

/// How a dead player died. Set exactly once, atomically with `alive = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeathCause {
    /// Killed by an impostor during the task phase.
    Killed,
    /// Voted out during a meeting.
    Ejected,
}

impl core::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Killed => write!(f, "KILLED"),
            Self::Ejected => write!(f, "EJECTED"),
        }
    }
}

/// The four sabotage systems an impostor can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SabotageKind {
    /// Redacts visible-player names in crewmate room context.
    Lights,
    /// Hides the task list and task bar from crewmates.
    Comms,
    /// Critical: crewmates lose task actions until fixed.
    Oxygen,
    /// Critical: crewmates lose task actions until fixed.
    Reactor,
}

impl SabotageKind {
    /// All sabotage kinds, in trigger-menu order.
    pub const ALL: [Self; 4] = [Self::Lights, Self::Comms, Self::Oxygen, Self::Reactor];

    /// Ticks the sabotage stays active before auto-repairing.
    ///
    /// Critical sabotages run longer to force a crew response.
    pub const fn duration_ticks(self) -> u32 {
        match self {
            Self::Lights | Self::Comms => 3,
            Self::Oxygen | Self::Reactor => 4,
        }
    }

    /// Whether this sabotage locks crewmates out of task actions.
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::Oxygen | Self::Reactor)
    }
}

impl core::fmt::Display for SabotageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Lights => write!(f, "LIGHTS"),
            Self::Comms => write!(f, "COMMS"),
            Self::Oxygen => write!(f, "OXYGEN"),
            Self::Reactor => write!(f, "REACTOR"),
        }
    }
}

/// The agent's current high-level goal, tracked per tick by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Working through the assigned task list.
    TaskExecution,
    /// Dispatched to fix an active critical sabotage.
    CrisisResponse,
    /// Following up on suspicious observations.
    Investigation,
    /// The player is dead; intent is locked.
    Dead,
}

/// Crisis-dispatch tag assigned each tick while a critical sabotage is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrisisRole {
    /// One of the two living crewmates nearest the fix room.
    CrisisResponder,
    /// Everyone else: continue tasks, ignore the alarm.
    IgnoreAlarm,
}

/// Evidence class of a verified observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationKind {
    /// Ordinary first-hand sight (room context, co-located players).
    Visual,
    /// Witnessed kill or vent, or a body discovery. Strongest evidence class.
    VisualCrime,
}

/// The labeled discussion rounds of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeetingStage {
    /// Round 0: share facts only.
    Testimony,
    /// Round 1: compare testimonies, surface contradictions.
    AccusationDefense,
    /// Round 2+: summarize evidence and state voting intent.
    FinalArguments,
}

impl MeetingStage {
    /// Map a discussion round number onto its stage label.
    ///
    /// Rounds beyond the third all count as final arguments.
    pub const fn from_round(round: u32) -> Self {
        match round {
            0 => Self::Testimony,
            1 => Self::AccusationDefense,
            _ => Self::FinalArguments,
        }
    }

    /// Human-readable stage name used in broadcasts and logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Testimony => "Testimony",
            Self::AccusationDefense => "Accusation/Defense",
            Self::FinalArguments => "Final Arguments",
        }
    }
}

/// Debate role assigned to a speaker each discussion round.
///
/// Recomputed every round from current evidence, never cached per meeting,
/// so a bystander who gets accused mid-meeting becomes a defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingRole {
    /// Holds eyewitness evidence of a crime; presents it forcefully.
    Prosecutor,
    /// Has location data but no crime evidence; asks questions.
    Detective,
    /// Is under accusation; defends with specifics.
    Defender,
    /// No strong evidence, not accused; listens and evaluates.
    Bystander,
    /// Accused *and* holds eyewitness evidence: defends by attacking.
    CounterAttacker,
}

impl MeetingRole {
    /// Display label used in prompts.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Prosecutor => "Prosecutor",
            Self::Detective => "Detective",
            Self::Defender => "Defender",
            Self::Bystander => "Bystander",
            Self::CounterAttacker => "Counter-Attacker",
        }
    }
}

/// Terminal outcome of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    /// Impostors reached parity with crewmates.
    ImpostorParity,
    /// Every impostor was ejected.
    CrewmateVote,
    /// The crew task bar reached 100%.
    CrewmateTasks,
    /// The timestep limit was reached.
    ImpostorTimeout,
}

impl Winner {
    /// Numeric winner code written to the game summary.
    pub const fn code(self) -> u8 {
        match self {
            Self::ImpostorParity => 1,
            Self::CrewmateVote => 2,
            Self::CrewmateTasks => 3,
            Self::ImpostorTimeout => 4,
        }
    }

    /// Human-readable reason string written to the game summary.
    pub const fn reason(self) -> &'static str {
        match self {
            Self::ImpostorParity => "Impostors win! (Crewmates outnumbered or tied)",
            Self::CrewmateVote => "Crewmates win! (Impostors eliminated)",
            Self::CrewmateTasks => "Crewmates win! (All tasks completed)",
            Self::ImpostorTimeout => "Impostors win! (Time limit reached)",
        }
    }
}

/// Duration class of a task in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Two-turn task.
    Short,
    /// Three-turn task; high-risk commitment.
    Long,
    /// Two-turn task shared by the whole crew.
    Common,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_opposite() {
        assert_eq!(Role::Crewmate.opposite(), Role::Impostor);
        assert_eq!(Role::Impostor.opposite(), Role::Crewmate);
    }

    #[test]
    fn critical_sabotages() {
        assert!(SabotageKind::Oxygen.is_critical());
        assert!(SabotageKind::Reactor.is_critical());
        assert!(!SabotageKind::Lights.is_critical());
        assert!(!SabotageKind::Comms.is_critical());
    }

    #[test]
    fn sabotage_durations() {
        assert_eq!(SabotageKind::Lights.duration_ticks(), 3);
        assert_eq!(SabotageKind::Oxygen.duration_ticks(), 4);
    }

    #[test]
    fn meeting_stage_from_round_saturates() {
        assert_eq!(MeetingStage::from_round(0), MeetingStage::Testimony);
        assert_eq!(MeetingStage::from_round(1), MeetingStage::AccusationDefense);
        assert_eq!(MeetingStage::from_round(2), MeetingStage::FinalArguments);
        assert_eq!(MeetingStage::from_round(9), MeetingStage::FinalArguments);
    }

    #[test]
    fn winner_codes_match_summary_interface() {
        assert_eq!(Winner::ImpostorParity.code(), 1);
        assert_eq!(Winner::CrewmateVote.code(), 2);
        assert_eq!(Winner::CrewmateTasks.code(), 3);
        assert_eq!(Winner::ImpostorTimeout.code(), 4);
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Phase::Task).ok().as_deref(), Some("\"task\""));
    }
}
