//! Core entity structs: tasks, bodies, and the game configuration.

use serde::{Deserialize, Serialize};

use crate::enums::TaskKind;
use crate::ids::{PlayerId, RoomId, TaskId};

/// A task instance assigned to one player.
///
/// `remaining` counts down from `max_duration` one turn per COMPLETE-TASK
/// while the player is in `room`; the task is done at zero and completion is
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique instance identifier.
    pub id: TaskId,
    /// Catalog name, e.g. "Fix Wiring".
    pub name: String,
    /// The room the task must be performed in.
    pub room: RoomId,
    /// Duration class from the catalog.
    pub kind: TaskKind,
    /// Total turns required.
    pub max_duration: u32,
    /// Turns still required. Invariant: `remaining <= max_duration`.
    pub remaining: u32,
    /// Whether completing the final turn plays a visible animation.
    ///
    /// Visual tasks prove the performer is a crewmate and cannot be faked.
    pub is_visual: bool,
    /// The player this instance is assigned to.
    pub assigned_to: PlayerId,
}

impl Task {
    /// Whether the task is finished.
    pub const fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Whether the task has been started but not finished.
    pub const fn in_progress(&self) -> bool {
        self.remaining > 0 && self.remaining < self.max_duration
    }

    /// Spend one turn on the task. No-op once complete.
    pub const fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// A corpse lying in a room, awaiting discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadBody {
    /// Who died.
    pub player: PlayerId,
    /// Where the body lies.
    pub room: RoomId,
    /// Set once an executed REPORT/CALL action (or forced report) fires.
    pub reported: bool,
}

/// Game-level configuration knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Total players in the roster.
    pub num_players: u32,
    /// How many of them are impostors.
    pub num_impostors: u32,
    /// Tick limit; reaching it is an impostor win.
    pub max_timesteps: u64,
    /// Discussion rounds per meeting before voting.
    pub discussion_rounds: u32,
    /// Emergency-button budget for the whole game.
    pub max_num_buttons: u32,
    /// Ticks an impostor must wait between kills.
    pub kill_cooldown: u32,
    /// Ticks an impostor must wait between sabotages.
    #[serde(default = "default_sabotage_cooldown")]
    pub sabotage_cooldown: u32,
    /// Tasks drawn from the catalog for each player at initialization.
    #[serde(default = "default_tasks_per_player")]
    pub tasks_per_player: u32,
}

/// Default sabotage cooldown when the config omits it.
const fn default_sabotage_cooldown() -> u32 {
    3
}

/// Default per-player task draw when the config omits it.
const fn default_tasks_per_player() -> u32 {
    3
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_players: 5,
            num_impostors: 1,
            max_timesteps: 50,
            discussion_rounds: 3,
            max_num_buttons: 1,
            kill_cooldown: 2,
            sabotage_cooldown: default_sabotage_cooldown(),
            tasks_per_player: default_tasks_per_player(),
        }
    }
}

impl GameConfig {
    /// Number of crewmates implied by the player and impostor counts.
    pub const fn num_crewmates(&self) -> u32 {
        self.num_players.saturating_sub(self.num_impostors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(max: u32, remaining: u32) -> Task {
        Task {
            id: TaskId(0),
            name: String::from("Fix Wiring"),
            room: RoomId(3),
            kind: TaskKind::Common,
            max_duration: max,
            remaining,
            is_visual: false,
            assigned_to: PlayerId(0),
        }
    }

    #[test]
    fn fresh_task_is_neither_complete_nor_in_progress() {
        let task = make_task(2, 2);
        assert!(!task.is_complete());
        assert!(!task.in_progress());
    }

    #[test]
    fn advancing_marks_in_progress_then_complete() {
        let mut task = make_task(2, 2);
        task.advance();
        assert!(task.in_progress());
        assert!(!task.is_complete());
        task.advance();
        assert!(task.is_complete());
        assert!(!task.in_progress());
    }

    #[test]
    fn advance_is_terminal_at_zero() {
        let mut task = make_task(2, 0);
        task.advance();
        assert_eq!(task.remaining, 0);
    }

    #[test]
    fn config_crewmate_count() {
        let config = GameConfig::default();
        assert_eq!(config.num_crewmates(), 4);
    }

    #[test]
    fn config_yaml_defaults_sabotage_cooldown() {
        let json = r#"{
            "num_players": 7, "num_impostors": 2, "max_timesteps": 60,
            "discussion_rounds": 3, "max_num_buttons": 2, "kill_cooldown": 3
        }"#;
        let config: GameConfig = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(config.sabotage_cooldown, 3);
        assert_eq!(config.num_players, 7);
    }
}
