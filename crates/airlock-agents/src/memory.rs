//! Per-agent structured memory: verified observations vs hearsay.
//!
//! Every player owns one [`MemoryState`]. It strictly separates *what the
//! player physically saw* (the verified stream, engine-written through the
//! message router) from *what other players said* (the social log), so that
//! prompt assembly can forbid the model from presenting hearsay as first-hand
//! evidence. The two stores are disjoint by construction: every incoming
//! event is classified exactly once by [`MemoryState::classify_observation`].
//!
//! The memory also tracks the task-commitment scalar that gates MOVE
//! legality, the engine-assigned crisis role, the agent's own public
//! statements (for self-consistency warnings), and -- for impostors -- the
//! parallel fake-memory track used to keep lies consistent across meeting
//! rounds.

use airlock_types::{CrisisRole, Intent, ObservationKind, RoomId, Task};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Own public statements kept for self-consistency checks.
const OWN_CLAIMS_CAP: usize = 8;

/// Commitment value while a multi-turn task is actively in progress here.
fn commitment_in_progress() -> Decimal {
    Decimal::ONE
}

/// Commitment value while a pending (unstarted) task is in this room.
fn commitment_pending() -> Decimal {
    Decimal::new(9, 1)
}

/// Per-tick commitment decay when no local task applies.
fn commitment_decay() -> Decimal {
    Decimal::new(3, 1)
}

/// The lock threshold: at or above this, MOVE is removed from the legal set
/// when a pending task is in the current room.
pub fn commitment_lock_threshold() -> Decimal {
    Decimal::new(8, 1)
}

/// One engine-recorded entry of where the player was and what they did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    /// The room occupied.
    pub room: RoomId,
    /// The tick of the record.
    pub tick: u64,
    /// Rendered form of the action taken that tick.
    pub action_taken: String,
}

/// An event the player physically witnessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedEntry {
    /// The tick of the event.
    pub tick: u64,
    /// Rendered event line.
    pub event: String,
    /// Evidence class.
    pub kind: ObservationKind,
    /// The room the player was in when witnessing it.
    pub room: RoomId,
}

/// A claim made by another player. May be a lie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialEntry {
    /// The tick the claim was made.
    pub tick: u64,
    /// Display name of the speaker.
    pub speaker: String,
    /// The rendered claim.
    pub claim: String,
}

/// One of the agent's own public statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnStatement {
    /// The tick the statement was made.
    pub tick: u64,
    /// The statement text.
    pub claim: String,
}

/// One entry of the impostor's fabricated public history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeEntry {
    /// The tick this cover story refers to.
    pub turn: u64,
    /// The room the impostor will claim to have been in.
    pub room: RoomId,
    /// The claimed activity.
    pub activity: String,
}

/// Persistent structured memory for one agent.
///
/// Only the message router (and the post-tick bookkeeping it drives) writes
/// here; the agent reads it through the perception payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryState {
    /// Append-only location trace, engine-written.
    location_history: Vec<LocationEntry>,
    /// Ground-truth visual observations.
    verified: Vec<VerifiedEntry>,
    /// Hearsay from other players.
    social: Vec<SocialEntry>,
    /// The agent's own public statements, bounded to the last
    /// [`OWN_CLAIMS_CAP`].
    own_claims: Vec<OwnStatement>,
    /// Engine-tracked high-level goal.
    pub current_intent: Intent,
    /// Task-commitment scalar in `[0, 1]`.
    pub task_commitment: Decimal,
    /// Crisis-dispatch tag, set each tick while a critical sabotage is
    /// active and cleared otherwise.
    pub crisis_role: Option<CrisisRole>,
    /// Impostor-only fabricated history (empty for crewmates).
    fake_memory: Vec<FakeEntry>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    /// Create a fresh memory for a living player.
    pub fn new() -> Self {
        Self {
            location_history: Vec::new(),
            verified: Vec::new(),
            social: Vec::new(),
            own_claims: Vec::new(),
            current_intent: Intent::TaskExecution,
            task_commitment: Decimal::ZERO,
            crisis_role: None,
            fake_memory: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Engine-facing writers
    // -------------------------------------------------------------------

    /// Append a location record with the action the player took.
    ///
    /// This is the immutable verified history the model cannot contradict
    /// during meetings.
    pub fn record_location(&mut self, room: RoomId, tick: u64, action_taken: impl Into<String>) {
        self.location_history.push(LocationEntry {
            room,
            tick,
            action_taken: action_taken.into(),
        });
    }

    /// Record something the player physically witnessed.
    pub fn add_verified(
        &mut self,
        tick: u64,
        event: impl Into<String>,
        room: RoomId,
        kind: ObservationKind,
    ) {
        self.verified.push(VerifiedEntry {
            tick,
            event: event.into(),
            kind,
            room,
        });
    }

    /// Record a claim made by another player.
    pub fn add_hearsay(&mut self, tick: u64, speaker: impl Into<String>, claim: impl Into<String>) {
        self.social.push(SocialEntry {
            tick,
            speaker: speaker.into(),
            claim: claim.into(),
        });
    }

    /// Classify a raw observation line and route it to the correct store.
    ///
    /// Classification is by event prefix:
    /// - `[CONFIRMED EYEWITNESS]`, or `SAW` together with `KILL`/`VENT`,
    ///   routes to the verified store as [`ObservationKind::VisualCrime`]
    /// - `said:` or a `[Discussion Round N]` prefix routes to hearsay
    /// - everything else (room context, system notes) is verified
    ///   [`ObservationKind::Visual`]
    pub fn classify_observation(&mut self, tick: u64, raw: &str, room: RoomId) {
        let upper = raw.to_uppercase();

        if upper.contains("[CONFIRMED EYEWITNESS]") {
            self.add_verified(tick, raw, room, ObservationKind::VisualCrime);
            return;
        }
        if upper.contains("SAW") && (upper.contains("KILL") || upper.contains("VENT")) {
            self.add_verified(tick, raw, room, ObservationKind::VisualCrime);
            return;
        }
        if raw.contains("said:") || raw.starts_with("[Discussion Round") {
            let speaker = extract_speaker(raw).unwrap_or_else(|| String::from("unknown"));
            self.add_hearsay(tick, speaker, raw);
            return;
        }
        self.add_verified(tick, raw, room, ObservationKind::Visual);
    }

    /// Record a public statement the agent made itself.
    ///
    /// Later prompts replay these so the agent does not flip its story
    /// mid-meeting. Bounded to the last [`OWN_CLAIMS_CAP`] entries.
    pub fn record_own_statement(&mut self, tick: u64, claim: impl Into<String>) {
        self.own_claims.push(OwnStatement {
            tick,
            claim: claim.into(),
        });
        if self.own_claims.len() > OWN_CLAIMS_CAP {
            let excess = self.own_claims.len().saturating_sub(OWN_CLAIMS_CAP);
            self.own_claims.drain(..excess);
        }
    }

    /// Append an entry to the impostor's fake-memory track.
    ///
    /// On a KILL the caller passes the alibi room, not the kill room.
    pub fn record_fake(&mut self, turn: u64, room: RoomId, activity: impl Into<String>) {
        self.fake_memory.push(FakeEntry {
            turn,
            room,
            activity: activity.into(),
        });
    }

    /// Recalculate the task-commitment scalar from the player's position.
    ///
    /// - In-progress local task: commitment locks at 1.0
    /// - Pending local task: 0.9
    /// - Otherwise: decays by 0.3 per tick toward zero
    pub fn update_task_commitment(&mut self, room: RoomId, tasks: &[Task]) {
        for task in tasks {
            if task.is_complete() || task.room != room {
                continue;
            }
            self.task_commitment = if task.in_progress() {
                commitment_in_progress()
            } else {
                commitment_pending()
            };
            self.current_intent = Intent::TaskExecution;
            return;
        }
        let decayed = self.task_commitment.saturating_sub(commitment_decay());
        self.task_commitment = decayed.max(Decimal::ZERO);
    }

    /// Lock memory into the dead state.
    pub fn set_dead(&mut self) {
        self.current_intent = Intent::Dead;
        self.task_commitment = Decimal::ZERO;
    }

    // -------------------------------------------------------------------
    // Readers
    // -------------------------------------------------------------------

    /// The engine-recorded location trace.
    pub fn location_history(&self) -> &[LocationEntry] {
        &self.location_history
    }

    /// Ground-truth visual observations.
    pub fn verified(&self) -> &[VerifiedEntry] {
        &self.verified
    }

    /// Hearsay from other players.
    pub fn social(&self) -> &[SocialEntry] {
        &self.social
    }

    /// The agent's own bounded statement history.
    pub fn own_claims(&self) -> &[OwnStatement] {
        &self.own_claims
    }

    /// The impostor's fabricated timeline.
    pub fn fake_memory(&self) -> &[FakeEntry] {
        &self.fake_memory
    }

    /// Whether any verified observation is crime-grade evidence.
    pub fn has_crime_evidence(&self) -> bool {
        self.verified
            .iter()
            .any(|entry| entry.kind == ObservationKind::VisualCrime)
    }

    /// Replace all speech observations of a finished discussion round with
    /// one condensed summary entry.
    ///
    /// Prevents unbounded context growth: without this, round chatter pushes
    /// eyewitness evidence out of the prompt window.
    pub fn condense_round(&mut self, round_tag: &str, tick: u64, summary: impl Into<String>) {
        let had_speeches = self.social.iter().any(|entry| entry.claim.contains(round_tag));
        self.social.retain(|entry| !entry.claim.contains(round_tag));
        if had_speeches {
            self.add_hearsay(tick, "all players", summary);
        }
    }
}

/// Pull a `Player N: color` speaker out of a rendered speech line.
fn extract_speaker(raw: &str) -> Option<String> {
    let said_at = raw.find(" said:")?;
    let head = raw.get(..said_at)?;
    // Strip a possible "[Discussion Round N] " prefix.
    let name_start = head.rfind("] ").map_or(0, |i| i.saturating_add(2));
    let name = head.get(name_start..)?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_owned())
    }
}
