//! Player state: identity, position, aliveness, tasks, and memory.

use airlock_types::{DeathCause, PlayerId, Role, RoomId, Task, TaskId};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::memory::MemoryState;

/// The color pool drawn from at initialization.
pub const PLAYER_COLORS: [&str; 12] = [
    "red", "blue", "green", "pink", "orange", "yellow", "black", "white", "purple", "brown",
    "cyan", "lime",
];

/// One engine-recorded snapshot of who shared the player's room at tick end.
///
/// This is code-generated ground truth, presented to the agent as personal
/// memory; it covers only rooms the player was physically in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// The tick of the snapshot.
    pub tick: u64,
    /// Room occupied at the end of that tick.
    pub room: RoomId,
    /// Living players seen in the same room.
    pub players_seen: Vec<PlayerId>,
}

/// The impostor's private deception ledger, written by the engine when a
/// kill resolves. Meeting prompts surface it so the lie stays consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deception {
    /// Where the last kill actually happened.
    pub kill_room: Option<RoomId>,
    /// Who was killed.
    pub victim: Option<PlayerId>,
    /// The walk-adjacent room the impostor will claim instead.
    pub public_alibi: Option<RoomId>,
}

/// One line of the player's own action history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The tick of the action.
    pub tick: u64,
    /// Rendered phase tag, e.g. `task` or `meeting - round 1`.
    pub phase: String,
    /// Rendered action line.
    pub line: String,
}

/// A player in the game.
///
/// Invariants: exactly one room at any time; once `alive` is false it never
/// becomes true again, and the death metadata is set atomically with the
/// transition (see [`Player::mark_dead`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Stable identifier.
    pub id: PlayerId,
    /// Display name, e.g. `Player 3: cyan`.
    pub name: String,
    /// Assigned color.
    pub color: String,
    /// Hidden allegiance.
    pub role: Role,
    /// Current room.
    pub room: RoomId,
    /// Room occupied before the last movement, if any.
    pub previous_room: Option<RoomId>,
    /// Whether the player is alive.
    pub alive: bool,
    /// Assigned tasks (impostors hold fake-cover copies of real tasks).
    pub tasks: Vec<Task>,
    /// Remaining kill cooldown. Only meaningful for impostors.
    pub kill_cooldown: u32,
    /// Tick of death, set exactly once.
    pub death_timestep: Option<u64>,
    /// Cause of death, set exactly once.
    pub death_cause: Option<DeathCause>,
    /// Structured memory, written only through the message router.
    pub memory: MemoryState,
    /// Impostor-only deception ledger (default-empty for crewmates).
    pub deception: Deception,
    /// Engine-recorded presence stream.
    pub presence_log: Vec<PresenceRecord>,
    /// The player's own action history.
    pub action_history: Vec<ActionRecord>,
}

impl Player {
    /// Create a living player at a spawn room.
    pub fn new(id: PlayerId, index: u32, color: &str, role: Role, room: RoomId) -> Self {
        Self {
            id,
            name: format!("Player {}: {color}", index.saturating_add(1)),
            color: color.to_owned(),
            role,
            room,
            previous_room: None,
            alive: true,
            tasks: Vec::new(),
            kill_cooldown: 0,
            death_timestep: None,
            death_cause: None,
            memory: MemoryState::new(),
            deception: Deception::default(),
            presence_log: Vec::new(),
            action_history: Vec::new(),
        }
    }

    /// Transition the player to dead.
    ///
    /// Sets `alive`, `death_timestep`, and `death_cause` atomically and locks
    /// the memory intent. The transition is one-way and one-time.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AlreadyDead`] if the player is already dead.
    pub fn mark_dead(&mut self, tick: u64, cause: DeathCause) -> Result<(), AgentError> {
        if !self.alive {
            return Err(AgentError::AlreadyDead(self.id));
        }
        self.alive = false;
        self.death_timestep = Some(tick);
        self.death_cause = Some(cause);
        self.memory.set_dead();
        Ok(())
    }

    /// Move to a new room, remembering the previous one.
    pub fn relocate(&mut self, to: RoomId) {
        if to != self.room {
            self.previous_room = Some(self.room);
            self.room = to;
        }
    }

    /// Look up an owned task by id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Mutable lookup of an owned task by id.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownTask`] if the player does not own it.
    pub fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, AgentError> {
        let player = self.id;
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AgentError::UnknownTask { player, task: id })
    }

    /// How many of the player's tasks are finished.
    pub fn completed_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_complete()).count()
    }

    /// Whether an incomplete multi-turn task is in progress in `room`.
    pub fn has_local_in_progress_task(&self, room: RoomId) -> bool {
        self.tasks
            .iter()
            .any(|t| !t.is_complete() && t.in_progress() && t.room == room)
    }

    /// Whether any incomplete task is bound to `room`.
    pub fn has_local_pending_task(&self, room: RoomId) -> bool {
        self.tasks.iter().any(|t| !t.is_complete() && t.room == room)
    }

    /// Whether the player has personally witnessed a kill or vent.
    ///
    /// Ghosts cannot act on witnessed crimes (no reports, no meetings), so
    /// this is always false for dead players.
    pub fn has_witnessed_crime(&self) -> bool {
        self.alive && self.memory.has_crime_evidence()
    }

    /// Whether the player holds any suspicion-grade observation short of a
    /// witnessed crime.
    pub fn has_suspicious_observation(&self) -> bool {
        self.memory
            .verified()
            .iter()
            .any(|entry| is_suspicious_line(&entry.event))
            || self
                .memory
                .social()
                .iter()
                .any(|entry| is_suspicious_line(&entry.claim))
    }

    /// Whether the player's name is being accused in recent hearsay.
    ///
    /// Scans the last few social entries for the player's name next to
    /// accusation vocabulary. Drives speaker priority and the defender
    /// meeting role.
    pub fn is_accused(&self, window: usize) -> bool {
        let name_lower = self.name.to_lowercase();
        let social = self.memory.social();
        let start = social.len().saturating_sub(window);
        social
            .iter()
            .skip(start)
            .any(|entry| {
                let line = entry.claim.to_lowercase();
                line.contains(&name_lower) && is_accusation_line(&line)
            })
    }
}

/// Accusation vocabulary scanned for in hearsay lines.
fn is_accusation_line(lower: &str) -> bool {
    ["suspicious", "impostor", "kill", "vote", "lying", "liar", "accuse", "sus", "eject"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Suspicion vocabulary for observations that fall short of hard evidence.
fn is_suspicious_line(claim: &str) -> bool {
    let lower = claim.to_lowercase();
    lower.contains("suspicious") || lower.contains("impostor")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_types::ObservationKind;

    use super::*;

    fn make_player(role: Role) -> Player {
        Player::new(PlayerId(0), 0, "red", role, RoomId(0))
    }

    #[test]
    fn name_includes_index_and_color() {
        let player = make_player(Role::Crewmate);
        assert_eq!(player.name, "Player 1: red");
    }

    #[test]
    fn mark_dead_sets_metadata_once() {
        let mut player = make_player(Role::Crewmate);
        player.mark_dead(4, DeathCause::Killed).unwrap();
        assert!(!player.alive);
        assert_eq!(player.death_timestep, Some(4));
        assert_eq!(player.death_cause, Some(DeathCause::Killed));

        // A second transition is rejected and leaves metadata untouched.
        let result = player.mark_dead(9, DeathCause::Ejected);
        assert!(result.is_err());
        assert_eq!(player.death_timestep, Some(4));
        assert_eq!(player.death_cause, Some(DeathCause::Killed));
    }

    #[test]
    fn relocate_tracks_previous_room() {
        let mut player = make_player(Role::Crewmate);
        player.relocate(RoomId(3));
        assert_eq!(player.room, RoomId(3));
        assert_eq!(player.previous_room, Some(RoomId(0)));
        // Relocating to the same room is a no-op.
        player.relocate(RoomId(3));
        assert_eq!(player.previous_room, Some(RoomId(0)));
    }

    #[test]
    fn dead_players_never_report_witnessed_crimes() {
        let mut player = make_player(Role::Crewmate);
        player
            .memory
            .add_verified(2, "[CONFIRMED EYEWITNESS] saw a kill", RoomId(0), ObservationKind::VisualCrime);
        assert!(player.has_witnessed_crime());
        player.mark_dead(3, DeathCause::Killed).unwrap();
        assert!(!player.has_witnessed_crime());
    }

    #[test]
    fn accusation_scan_matches_name_and_vocabulary() {
        let mut player = make_player(Role::Crewmate);
        player.memory.add_hearsay(
            5,
            "Player 2: blue",
            "[Discussion Round 1] Player 2: blue said: \"Player 1: red is suspicious\"",
        );
        assert!(player.is_accused(5));

        let mut unaccused = make_player(Role::Crewmate);
        unaccused.memory.add_hearsay(
            5,
            "Player 2: blue",
            "[Discussion Round 1] Player 2: blue said: \"I saw nothing\"",
        );
        assert!(!unaccused.is_accused(5));
    }

    #[test]
    fn local_task_checks() {
        let mut player = make_player(Role::Crewmate);
        player.tasks.push(Task {
            id: TaskId(1),
            name: String::from("Fix Wiring"),
            room: RoomId(2),
            kind: airlock_types::TaskKind::Common,
            max_duration: 2,
            remaining: 2,
            is_visual: false,
            assigned_to: player.id,
        });
        assert!(player.has_local_pending_task(RoomId(2)));
        assert!(!player.has_local_in_progress_task(RoomId(2)));

        if let Ok(task) = player.task_mut(TaskId(1)) {
            task.advance();
        }
        assert!(player.has_local_in_progress_task(RoomId(2)));

        if let Ok(task) = player.task_mut(TaskId(1)) {
            task.advance();
        }
        assert!(!player.has_local_pending_task(RoomId(2)));
        assert_eq!(player.completed_task_count(), 1);
    }
}
