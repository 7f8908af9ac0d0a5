//! Record schemas for the engine's external log interfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Game-state snapshot taken at the moment an action resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Living crewmates.
    pub living_crew: u32,
    /// Living impostors.
    pub living_imps: u32,
    /// Crew task-bar percentage, 0-100.
    pub task_pct: f64,
    /// Whether any sabotage is active.
    pub sabotage_active: bool,
    /// Whether the acting player is alive.
    pub player_alive: bool,
    /// Room name of the acting player.
    pub player_location: String,
}

/// One resolved action in the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// The tick of the action.
    pub timestep: u64,
    /// Phase name, `task` or `meeting`.
    pub phase: String,
    /// Discussion round, present only in meetings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    /// Rendered action line.
    pub action: String,
    /// Acting player's display name.
    pub player: String,
    /// Snapshot at record time.
    pub state: StateSnapshot,
}

/// The prompt/response pair of one LLM decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmInteraction {
    /// The rendered system message.
    pub system_prompt: String,
    /// The rendered user-side messages (state injection + action request).
    pub prompt: serde_json::Value,
    /// Parsed sections of the response (thought, speech, action line).
    pub response: serde_json::Value,
    /// The raw model output.
    pub full_response: String,
    /// The action the engine actually resolved to.
    pub resolved_action: String,
}

/// One per-decision line of the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Index of the game within the run.
    pub game_index: u32,
    /// The tick of the decision.
    pub step: u64,
    /// Wall-clock time of the decision.
    pub timestamp: DateTime<Utc>,
    /// Deciding player's display name.
    pub player: String,
    /// The full interaction payload.
    pub interaction: LlmInteraction,
}

/// Per-player entry in the game summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Display name.
    pub name: String,
    /// Assigned color.
    pub color: String,
    /// Role name.
    pub identity: String,
    /// Decision backend identifier (model name or `scripted`).
    pub model: String,
    /// Assigned task names.
    pub tasks: Vec<String>,
}

/// Terminal summary of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Unique id of this run.
    pub session: uuid::Uuid,
    /// Index of the game within the run.
    pub game_index: u32,
    /// The configuration the game ran with.
    pub config: serde_json::Value,
    /// Every player's assignment.
    pub players: Vec<PlayerSummary>,
    /// Winner code: 1 impostor kills, 2 crewmate vote, 3 crewmate tasks,
    /// 4 impostor timeout.
    pub winner: u8,
    /// Human-readable reason.
    pub winner_reason: String,
    /// Final tick.
    pub final_timestep: u64,
}
