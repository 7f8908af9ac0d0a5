//! The epistemically filtered view handed to a deciding agent.
//!
//! [`Perception`] is the *only* information a decider receives about the
//! world. It is assembled by the engine from the player's own `MemoryState`
//! plus the line-of-sight filter over the post-movement world, and it is the
//! input to prompt assembly -- a pure function of this payload produces the
//! 4-message conversation. Nothing outside a player's epistemic boundary may
//! appear here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::enums::{CrisisRole, DeathCause, Intent, MeetingStage, ObservationKind, Phase, Role, SabotageKind};
use crate::ids::PlayerId;

/// One concrete legal action plus its prompt-facing rendering.
///
/// The parser resolves LLM text against `repr` and maps back to the typed
/// `action` by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalAction {
    /// The typed action instance.
    pub action: Action,
    /// Rendered form shown in the "Available actions" list,
    /// e.g. `MOVE from Cafeteria to Admin`.
    pub repr: String,
}

/// The deciding player's own identity block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfView {
    /// Stable player identifier.
    pub id: PlayerId,
    /// Display name, e.g. `Player 3: cyan`.
    pub name: String,
    /// Assigned color.
    pub color: String,
    /// Hidden allegiance (visible only to the player themself).
    pub role: Role,
    /// Whether the player is alive.
    pub alive: bool,
    /// How the player died, if dead.
    pub death_cause: Option<DeathCause>,
    /// When the player died, if dead.
    pub death_timestep: Option<u64>,
    /// Name of the current room.
    pub room: String,
    /// Name of the room occupied on the previous tick, if different.
    pub previous_room: Option<String>,
    /// Remaining kill cooldown (impostors only).
    pub kill_cooldown: Option<u32>,
}

/// What the player sees in their current room right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    /// Current room name.
    pub room: String,
    /// Living co-located players. Empty and `lights_out = true` while the
    /// LIGHTS sabotage blinds a crewmate.
    pub visible_players: Vec<String>,
    /// Names of unreported bodies here.
    pub dead_bodies: Vec<String>,
    /// Whether vision is redacted by the LIGHTS sabotage.
    pub lights_out: bool,
}

/// Public status of one roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name.
    pub name: String,
    /// Whether the player is publicly known to be alive.
    pub alive: bool,
    /// Death cause, if dead.
    pub death_cause: Option<DeathCause>,
    /// Death timestep, if dead.
    pub death_timestep: Option<u64>,
}

/// One engine-recorded entry of the player's personal presence stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    /// The tick the snapshot was taken.
    pub tick: u64,
    /// Room the player occupied at the end of that tick.
    pub room: String,
    /// Living players seen in the same room.
    pub players_seen: Vec<String>,
}

/// A first-hand verified observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedObservation {
    /// Tick the event happened.
    pub tick: u64,
    /// Rendered event line.
    pub event: String,
    /// Evidence class.
    pub kind: ObservationKind,
    /// Room the observer was in when witnessing it.
    pub location: String,
}

/// A claim made by another player -- hearsay, possibly a lie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HearsayEntry {
    /// Tick the claim was made.
    pub tick: u64,
    /// The speaker's display name.
    pub speaker: String,
    /// The rendered claim.
    pub claim: String,
}

/// A public statement this player made themself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnClaim {
    /// Tick the statement was made.
    pub tick: u64,
    /// The statement text.
    pub claim: String,
}

/// The structured memory view: strictly separated verified vs hearsay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryView {
    /// Events the player physically witnessed.
    pub verified: Vec<VerifiedObservation>,
    /// What other players said (may be lies).
    pub hearsay: Vec<HearsayEntry>,
    /// The player's own public statements (bounded ring).
    pub own_claims: Vec<OwnClaim>,
    /// Current engine-tracked intent.
    pub intent: Intent,
    /// Task-commitment scalar in `[0, 1]`.
    pub task_commitment: Decimal,
    /// Crisis-dispatch tag, if a critical sabotage is active.
    pub crisis_role: Option<CrisisRole>,
}

/// Progress state of a task as shown to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Finished; never revisit.
    Done,
    /// Started; turns remain.
    InProgress,
    /// Not yet started.
    Pending,
}

/// One assigned task as rendered into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    /// Catalog name.
    pub name: String,
    /// Room name the task is bound to.
    pub location: String,
    /// Progress state.
    pub status: TaskStatus,
    /// Turns still required, when started.
    pub turns_remaining: Option<u32>,
    /// Total turns the task takes.
    pub turns_required: u32,
    /// Whether completion is visibly provable.
    pub is_visual: bool,
    /// Walk path from the player's room to the task room (inclusive).
    pub path: Vec<String>,
}

/// Meeting-phase context for the decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingContext {
    /// Current stage label.
    pub stage: MeetingStage,
    /// Zero-based discussion round.
    pub round: u32,
    /// Total discussion rounds configured.
    pub rounds_total: u32,
    /// Who called the meeting, if known.
    pub caller: Option<String>,
    /// Whether the voting sub-phase has begun.
    pub voting: bool,
}

/// One entry of the impostor's parallel public-alibi history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeMemoryEntry {
    /// The tick this cover story refers to.
    pub turn: u64,
    /// The room the impostor will *claim* to have been in.
    pub room: String,
    /// The activity the impostor will claim.
    pub activity: String,
}

/// The impostor's private deception state, surfaced during meetings so the
/// lie stays consistent across rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeceptionLedger {
    /// Where the kill actually happened.
    pub kill_room: Option<String>,
    /// Who was killed.
    pub victim: Option<String>,
    /// The room the impostor claims to have been in instead.
    pub public_alibi: Option<String>,
    /// The full fabricated timeline.
    pub fake_memory: Vec<FakeMemoryEntry>,
}

/// A room and its direct connections, for the prompt's adjacency brief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyLine {
    /// Source room name.
    pub room: String,
    /// Directly reachable room names.
    pub connects: Vec<String>,
}

/// Static map description included in prompts so agents can reason about
/// legal travel and vent deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MapBrief {
    /// Walking connections per room.
    pub walk: Vec<AdjacencyLine>,
    /// Vent connections per room (impostor traversal; public knowledge for
    /// deduction purposes).
    pub vent: Vec<AdjacencyLine>,
}

/// The complete filtered world view for one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception {
    /// Current tick.
    pub tick: u64,
    /// Configured tick limit.
    pub max_timesteps: u64,
    /// Current phase.
    pub phase: Phase,
    /// Meeting context when `phase` is [`Phase::Meeting`].
    pub meeting: Option<MeetingContext>,
    /// The player's own identity block.
    pub self_state: SelfView,
    /// Line-of-sight view of the current room.
    pub room: RoomView,
    /// Public status of every player in the game.
    pub roster: Vec<RosterEntry>,
    /// Engine-recorded presence stream (rooms visited, players seen).
    pub presence_log: Vec<PresenceEntry>,
    /// Structured verified/hearsay memory.
    pub memory: MemoryView,
    /// Assigned tasks. Empty while COMMS hides the list from crewmates.
    pub tasks: Vec<TaskView>,
    /// Whether the COMMS sabotage currently hides tasks and the task bar.
    pub comms_jammed: bool,
    /// Global task-bar percentage, hidden under COMMS.
    pub task_bar_pct: Option<u8>,
    /// Sabotages currently active (everyone hears the alarm).
    pub active_sabotages: Vec<SabotageKind>,
    /// Fix-room name of the active critical sabotage, if any.
    pub critical_fix_room: Option<String>,
    /// Crewmate self-preservation score, 0-100.
    pub danger_score: u8,
    /// The player's own recent action lines.
    pub action_history: Vec<String>,
    /// Static walk/vent adjacency brief.
    pub map_brief: MapBrief,
    /// The concrete legal actions for this decision.
    pub legal_actions: Vec<LegalAction>,
    /// Impostor-only deception state.
    pub deception: Option<DeceptionLedger>,
}

impl Perception {
    /// Find the index of a legal action by its rendered repr.
    pub fn find_repr(&self, repr: &str) -> Option<usize> {
        self.legal_actions.iter().position(|la| la.repr == repr)
    }

    /// Whether the decision is a discussion turn (SPEAK legal, no movement).
    pub fn is_discussion(&self) -> bool {
        self.meeting.as_ref().is_some_and(|m| !m.voting)
    }

    /// Whether the decision is a voting turn.
    pub fn is_voting(&self) -> bool {
        self.meeting.as_ref().is_some_and(|m| m.voting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::VoteChoice;

    fn minimal_perception() -> Perception {
        Perception {
            tick: 3,
            max_timesteps: 50,
            phase: Phase::Task,
            meeting: None,
            self_state: SelfView {
                id: PlayerId(0),
                name: String::from("Player 1: red"),
                color: String::from("red"),
                role: Role::Crewmate,
                alive: true,
                death_cause: None,
                death_timestep: None,
                room: String::from("Cafeteria"),
                previous_room: None,
                kill_cooldown: None,
            },
            room: RoomView {
                room: String::from("Cafeteria"),
                visible_players: Vec::new(),
                dead_bodies: Vec::new(),
                lights_out: false,
            },
            roster: Vec::new(),
            presence_log: Vec::new(),
            memory: MemoryView {
                verified: Vec::new(),
                hearsay: Vec::new(),
                own_claims: Vec::new(),
                intent: Intent::TaskExecution,
                task_commitment: Decimal::ZERO,
                crisis_role: None,
            },
            tasks: Vec::new(),
            comms_jammed: false,
            task_bar_pct: Some(0),
            active_sabotages: Vec::new(),
            critical_fix_room: None,
            danger_score: 0,
            action_history: Vec::new(),
            map_brief: MapBrief::default(),
            legal_actions: vec![LegalAction {
                action: Action::Move { to: crate::ids::RoomId(1) },
                repr: String::from("MOVE from Cafeteria to Admin"),
            }],
            deception: None,
        }
    }

    #[test]
    fn find_repr_matches_exactly() {
        let perception = minimal_perception();
        assert_eq!(perception.find_repr("MOVE from Cafeteria to Admin"), Some(0));
        assert_eq!(perception.find_repr("MOVE from Cafeteria to Weapons"), None);
    }

    #[test]
    fn discussion_and_voting_flags() {
        let mut perception = minimal_perception();
        assert!(!perception.is_discussion());
        assert!(!perception.is_voting());

        perception.meeting = Some(MeetingContext {
            stage: MeetingStage::Testimony,
            round: 0,
            rounds_total: 3,
            caller: None,
            voting: false,
        });
        assert!(perception.is_discussion());

        if let Some(meeting) = perception.meeting.as_mut() {
            meeting.voting = true;
        }
        assert!(perception.is_voting());
    }

    #[test]
    fn perception_roundtrips_through_json() {
        let mut perception = minimal_perception();
        perception.legal_actions.push(LegalAction {
            action: Action::Vote { choice: VoteChoice::Skip },
            repr: String::from("VOTE SKIP"),
        });
        let json = serde_json::to_string(&perception).ok();
        assert!(json.is_some());
        let back: Option<Perception> =
            json.as_deref().and_then(|j| serde_json::from_str(j).ok());
        assert_eq!(back, Some(perception));
    }
}
