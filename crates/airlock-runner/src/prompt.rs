//! The 4-message prompt assembler.
//!
//! Every decision is presented to the model as a short conversation:
//!
//! 1. **System** -- the fixed role manual with the player's name
//!    interpolated (rendered through minijinja).
//! 2. **User, state injection** -- a JSON block of the engine-verified
//!    memory state, closed with "Confirm you have read this state."
//! 3. **Assistant, fake acknowledgment** -- a deterministic string written
//!    by the engine (never an LLM call) that parrots the identity, location,
//!    visible players, and active commitments back. Pre-filling the reply
//!    dramatically improves adherence to the injected state.
//! 4. **User, action request** -- the full textual context: roster,
//!    room context, memory streams, tasks, the available-actions list, the
//!    adjacency maps, and the phase-specific briefing.
//!
//! Assembly is a pure function of the perception payload, which makes it
//! testable without a game in flight.

use airlock_types::{ObservationKind, Perception, Phase, Role, TaskStatus};
use minijinja::Environment;

use crate::briefing::{meeting_briefing, task_phase_briefing, voting_briefing};
use crate::error::RunnerError;
use crate::llm::ChatMessage;
use crate::templates;

/// Approximate input-token budget; prompts beyond it are middle-truncated.
const MAX_INPUT_TOKENS: usize = 12_000;

/// Manages template rendering and conversation assembly.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create an engine with the embedded role manuals loaded.
    pub fn new() -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        env.add_template("crewmate", templates::CREWMATE_SYSTEM)
            .map_err(|e| RunnerError::Template(format!("failed to add crewmate template: {e}")))?;
        env.add_template("impostor", templates::IMPOSTOR_SYSTEM)
            .map_err(|e| RunnerError::Template(format!("failed to add impostor template: {e}")))?;
        env.add_template("ghost", templates::GHOST_SYSTEM)
            .map_err(|e| RunnerError::Template(format!("failed to add ghost template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the system manual for a perception.
    fn system_message(&self, perception: &Perception) -> Result<String, RunnerError> {
        let template = if !perception.self_state.alive {
            "ghost"
        } else {
            match perception.self_state.role {
                Role::Crewmate => "crewmate",
                Role::Impostor => "impostor",
            }
        };
        self.env
            .get_template(template)
            .map_err(|e| RunnerError::Template(format!("missing template {template}: {e}")))?
            .render(minijinja::context! { name => perception.self_state.name })
            .map_err(|e| RunnerError::Template(format!("{template} render failed: {e}")))
    }

    /// Assemble the full conversation for one decision.
    pub fn assemble(&self, perception: &Perception) -> Result<Vec<ChatMessage>, RunnerError> {
        let system = self.system_message(perception)?;
        if !perception.self_state.alive {
            return Ok(ghost_messages(system, perception));
        }

        let state_json = serde_json::to_string_pretty(&state_block(perception))
            .map_err(|e| RunnerError::Template(format!("state block failed: {e}")))?;
        let state_injection = format!(
            "[STATE INJECTION] Here is your current memory state. This is engine-verified ground truth.\n{state_json}\nConfirm you have read this state."
        );

        let mut action_request = format!(
            "Good. Now here is the full game context.\n\n{}",
            all_info(perception)
        );
        match (perception.phase, perception.is_voting()) {
            (Phase::Task, _) => {
                action_request.push_str(&task_phase_briefing(perception));
                action_request.push_str(
                    "\n\nReturn your output following the exact format specified in the system instructions.",
                );
            }
            (Phase::Meeting, false) => {
                action_request.push_str(&meeting_briefing(perception));
                action_request.push_str(
                    "\n\nRemember: respond in the THOUGHT / SPEAK format. THOUGHT first (private reasoning referencing your verified history), then SPEAK (public dialogue).",
                );
            }
            (Phase::Meeting, true) => {
                action_request.push_str(&voting_briefing(perception));
                action_request.push_str(
                    "\n\nReturn your output following the exact format specified in the system instructions.",
                );
            }
        }

        let mut messages = vec![
            ChatMessage::system(system),
            ChatMessage::user(state_injection),
            ChatMessage::assistant(fake_ack(perception)),
            ChatMessage::user(action_request),
        ];
        enforce_budget(&mut messages);
        Ok(messages)
    }
}

/// The simplified ghost conversation: dead players get a stripped prompt
/// with no suspicion machinery.
fn ghost_messages(system: String, perception: &Perception) -> Vec<ChatMessage> {
    let remaining: Vec<String> = perception
        .tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
        .map(|t| format!("{} (at {})", t.name, t.location))
        .collect();
    let task_list = if remaining.is_empty() {
        String::from("ALL TASKS COMPLETE")
    } else {
        remaining.join(", ")
    };

    let state_injection = format!(
        "[STATE INJECTION] You are {}. You are DEAD (GHOST). Current room: {}. Remaining tasks: {task_list}. Confirm you have read this state.",
        perception.self_state.name, perception.self_state.room
    );
    let ack = format!(
        "I have read the state. I am {}. I am DEAD. I am at {}. My remaining tasks: {task_list}.",
        perception.self_state.name, perception.self_state.room
    );

    let mut actions = String::new();
    for (i, la) in perception.legal_actions.iter().enumerate() {
        actions.push_str(&format!("{}. {}\n", i.saturating_add(1), la.repr));
    }
    let action_request = format!(
        "Good. You are a GHOST. Complete your remaining tasks to help your team win.\n\nAvailable actions:\n{actions}\nIf COMPLETE TASK is available, choose it. Otherwise MOVE to the room of your nearest task."
    );

    vec![
        ChatMessage::system(system),
        ChatMessage::user(state_injection),
        ChatMessage::assistant(ack),
        ChatMessage::user(action_request),
    ]
}

/// Build the structured state-injection block.
fn state_block(perception: &Perception) -> serde_json::Value {
    let me = &perception.self_state;
    let mut identity = serde_json::json!({
        "color": me.color,
        "name": me.name,
        "role": me.role.to_string().to_lowercase(),
        "status": if me.alive { "alive" } else { "dead" },
    });
    if !me.alive {
        if let Some(obj) = identity.as_object_mut() {
            obj.insert(
                String::from("death_cause"),
                serde_json::json!(me.death_cause.map(|c| c.to_string())),
            );
            obj.insert(String::from("death_turn"), serde_json::json!(me.death_timestep));
        }
    }

    let short_term: Vec<serde_json::Value> = perception
        .presence_log
        .iter()
        .rev()
        .take(5)
        .rev()
        .map(|entry| {
            serde_json::json!({
                "turn": entry.tick,
                "location": entry.room,
                "saw": entry.players_seen,
            })
        })
        .collect();

    let witnessed: Vec<&str> = perception
        .memory
        .verified
        .iter()
        .filter(|e| e.kind == ObservationKind::VisualCrime)
        .map(|e| e.event.as_str())
        .collect();

    let tasks: Vec<serde_json::Value> = perception
        .tasks
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "location": t.location,
                "status": t.status,
                "turns_remaining": t.turns_remaining,
            })
        })
        .collect();

    let meeting_notes: Vec<&str> = perception
        .memory
        .hearsay
        .iter()
        .rev()
        .take(8)
        .rev()
        .map(|e| e.claim.as_str())
        .collect();

    serde_json::json!({
        "my_identity": identity,
        "current_perception": {
            "location": perception.room.room,
            "visible_players": perception.room.visible_players,
            "dead_bodies": perception.room.dead_bodies,
            "sabotage_active": perception.active_sabotages,
        },
        "short_term_memory": short_term,
        "long_term_memory": { "witnessed_crimes": witnessed },
        "tasks": tasks,
        "meeting_notes": meeting_notes,
    })
}

/// The deterministic assistant acknowledgment (message 3).
fn fake_ack(perception: &Perception) -> String {
    let me = &perception.self_state;
    let status = if me.alive { "ALIVE" } else { "DEAD" };
    let visible = if perception.room.visible_players.is_empty() {
        String::from("no one")
    } else {
        perception.room.visible_players.join(", ")
    };
    let mut parts = vec![
        String::from("I have read the state."),
        format!("I am {}.", me.name),
        format!("I am at {}. Status: {status}.", me.room),
    ];
    if !perception.room.dead_bodies.is_empty() {
        parts.push(format!(
            "Dead bodies here: {}.",
            perception.room.dead_bodies.join(", ")
        ));
    }
    parts.push(format!("Visible players: {visible}."));

    if perception.memory.task_commitment >= rust_decimal::Decimal::new(8, 1)
        && !perception.is_discussion()
    {
        parts.push(String::from(
            "Task commitment: HIGH -- I must finish my current task.",
        ));
    }
    match perception.memory.crisis_role {
        Some(airlock_types::CrisisRole::CrisisResponder) => {
            parts.push(String::from("Crisis role: RESPONDER -- I must fix the sabotage."));
        }
        Some(airlock_types::CrisisRole::IgnoreAlarm) => {
            parts.push(String::from(
                "Crisis role: IGNORE -- others are closer, I continue tasks.",
            ));
        }
        None => {}
    }
    if perception.is_discussion() {
        if let Some(ledger) = &perception.deception
            && let Some(entry) = ledger.fake_memory.last()
        {
            parts.push(format!(
                "My cover story: T{}: {} ({}).",
                entry.turn, entry.room, entry.activity
            ));
        } else if let Some(last) = perception.presence_log.last() {
            parts.push(format!(
                "My last known position: T{} at {}.",
                last.tick, last.room
            ));
        }
    }
    parts.join(" ")
}

/// The full textual context of the action request (message 4).
fn all_info(perception: &Perception) -> String {
    let me = &perception.self_state;
    let mut out = String::new();

    // Status header: a rigid block the model cannot ignore.
    out.push_str(&format!(
        "CURRENT STATUS: {}\nROLE: {}\nCURRENT ROOM: {}\n",
        if me.alive { "ALIVE" } else { "DEAD (GHOST)" },
        me.role.to_string().to_uppercase(),
        me.room
    ));
    out.push_str(&format!(
        "Game Time: {}/{}\n\n",
        perception.tick, perception.max_timesteps
    ));

    // Roster state check with death annotations.
    out.push_str(&format!("[STATE CHECK] -- {} players in this game:\n", perception.roster.len()));
    for entry in &perception.roster {
        if entry.alive {
            out.push_str(&format!("  {}: ALIVE\n", entry.name));
        } else {
            let cause = entry.death_cause.map_or_else(
                || String::from("KILLED"),
                |c| c.to_string(),
            );
            let turn = entry
                .death_timestep
                .map_or_else(|| String::from("?"), |t| t.to_string());
            out.push_str(&format!(
                "  {}: DEAD ({cause} T{turn}) -- CANNOT VOTE, CANNOT SPEAK, GHOST TASKS ONLY\n",
                entry.name
            ));
        }
    }
    out.push_str("ONLY these players exist. Do NOT reference any player not in this list.\n\n");

    // Room context.
    out.push_str("[[ROOM_CONTEXT_START]]\n");
    out.push_str(&format!("Current Location: {}\n", perception.room.room));
    if perception.room.lights_out {
        out.push_str(
            "Living Players here: [LIGHTS OUT -- VISION REDUCED, CANNOT IDENTIFY PLAYERS]\n",
        );
    } else if perception.room.visible_players.is_empty() {
        out.push_str("Living Players here: None\n");
    } else {
        out.push_str(&format!(
            "Living Players here: {}\n",
            perception.room.visible_players.join(", ")
        ));
    }
    if !perception.room.dead_bodies.is_empty() {
        out.push_str(&format!(
            "Dead Bodies here: {}\n",
            perception.room.dead_bodies.join(", ")
        ));
    }
    match perception.task_bar_pct {
        Some(pct) => out.push_str(&format!("Global Task Bar: {pct}% complete\n")),
        None => out.push_str("Global Task Bar: [COMMUNICATIONS JAMMED]\n"),
    }
    if !perception.active_sabotages.is_empty() {
        let names: Vec<String> = perception
            .active_sabotages
            .iter()
            .map(ToString::to_string)
            .collect();
        out.push_str(&format!("Active sabotage: {}\n", names.join(", ")));
    }
    out.push_str("[[ROOM_CONTEXT_END]]\n\n");

    // Memory stream: the engine-recorded presence log.
    if !perception.presence_log.is_empty() {
        out.push_str("## YOUR MEMORY STREAM (what you personally remember seeing):\n");
        out.push_str("This ONLY covers rooms YOU were in.\n");
        for entry in perception.presence_log.iter().rev().take(8).rev() {
            if entry.players_seen.is_empty() {
                out.push_str(&format!("  T{}: I was at {} -- no one else was there\n", entry.tick, entry.room));
            } else {
                out.push_str(&format!(
                    "  T{}: I was at {} and saw {}\n",
                    entry.tick,
                    entry.room,
                    entry.players_seen.join(", ")
                ));
            }
        }
        out.push('\n');
    }

    // Hard memory vs social memory: strictly separated.
    let verified = &perception.memory.verified;
    if !verified.is_empty() {
        out.push_str("## YOUR HARD MEMORY (facts you SAW -- 100% reliable):\n");
        for entry in verified.iter().rev().take(12).rev() {
            let marker = match entry.kind {
                ObservationKind::VisualCrime => "[!]",
                ObservationKind::Visual => " - ",
            };
            out.push_str(&format!(
                " {marker} T{} [{}]: {}\n",
                entry.tick, entry.location, entry.event
            ));
        }
        out.push('\n');
    }
    let hearsay = &perception.memory.hearsay;
    if !hearsay.is_empty() {
        out.push_str("## YOUR SOCIAL MEMORY (what others SAID -- may be lies):\n");
        out.push_str(
            "You CANNOT claim to have SEEN an event that only appears here. Say 'X claimed that...' instead.\n",
        );
        for entry in hearsay.iter().rev().take(10).rev() {
            out.push_str(&format!("  T{} [{}]: {}\n", entry.tick, entry.speaker, entry.claim));
        }
        out.push('\n');
    }

    // Own action history.
    out.push_str("Action history:\n");
    if perception.action_history.is_empty() {
        out.push_str("No actions have been taken yet.\n");
    } else {
        for line in &perception.action_history {
            out.push_str(&format!("{line}\n"));
        }
    }
    out.push('\n');

    // Tasks.
    if perception.comms_jammed {
        out.push_str(
            "Your Assigned Tasks:\n[COMMUNICATIONS JAMMED -- task list temporarily unavailable.]\n\n",
        );
    } else {
        if me.role == Role::Impostor {
            out.push_str(
                "Your FAKE Tasks (cover -- stand in these rooms to look busy, reference them by name when asked):\n",
            );
        } else {
            out.push_str("Your Assigned Tasks:\n");
        }
        for (i, task) in perception.tasks.iter().enumerate() {
            let number = i.saturating_add(1);
            match task.status {
                TaskStatus::Done => {
                    out.push_str(&format!(
                        "{number}. {} at {} -- DONE, do NOT revisit\n",
                        task.name, task.location
                    ));
                }
                TaskStatus::InProgress => {
                    out.push_str(&format!(
                        "{number}. {} at {} -- IN PROGRESS ({} turn(s) remaining, STAY in this room)\n",
                        task.name,
                        task.location,
                        task.turns_remaining.unwrap_or(0)
                    ));
                }
                TaskStatus::Pending => {
                    out.push_str(&format!(
                        "{number}. {} at {} -- INCOMPLETE (requires {} turns)\n",
                        task.name, task.location, task.turns_required
                    ));
                    if task.path.len() > 1 {
                        out.push_str(&format!("   Path: {}\n", task.path.join(" -> ")));
                    } else {
                        out.push_str("   Path: You are already at the task location.\n");
                    }
                }
            }
        }
        out.push('\n');
    }

    // Adjacency brief.
    out.push_str("## ROOM ADJACENCY MAP (walking connections):\n");
    for line in &perception.map_brief.walk {
        out.push_str(&format!("{} -> {}\n", line.room, line.connects.join(", ")));
    }
    out.push_str("\n## VENT CONNECTIONS (impostors only; use for deduction):\n");
    for line in &perception.map_brief.vent {
        out.push_str(&format!("{} <-> {}\n", line.room, line.connects.join(", ")));
    }
    out.push('\n');

    // The available-actions list; the suffix the budget enforcement keeps.
    out.push_str(&format!(
        "Available actions (you are at {} -- you can ONLY choose from this list):\n",
        me.room
    ));
    for (i, la) in perception.legal_actions.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i.saturating_add(1), la.repr));
    }
    out
}

/// Middle-truncate the final user message when the estimated token count
/// exceeds the budget, preserving the "Available actions" suffix.
fn enforce_budget(messages: &mut [ChatMessage]) {
    let total_chars: usize = messages.iter().map(|m| m.content.len()).sum();
    let estimated_tokens = total_chars / 4;
    if estimated_tokens <= MAX_INPUT_TOKENS {
        return;
    }
    let excess_chars = estimated_tokens
        .saturating_sub(MAX_INPUT_TOKENS)
        .saturating_mul(4);
    let Some(last) = messages.last_mut() else {
        return;
    };
    let content = last.content.clone();
    let keep = content.len().saturating_sub(excess_chars);
    if let Some(actions_at) = content.rfind("Available actions") {
        let suffix = content.get(actions_at..).unwrap_or_default();
        let head_len = keep.saturating_sub(suffix.len());
        let head = truncate_at_boundary(&content, head_len);
        last.content = format!("{head}\n\n[...context truncated for length...]\n\n{suffix}");
    } else {
        let head = truncate_at_boundary(&content, keep);
        last.content =
            format!("{head}\n\n[...context truncated for length. Respond based on available information...]");
    }
}

/// Cut a string at a char boundary at or below `limit` bytes.
fn truncate_at_boundary(text: &str, limit: usize) -> &str {
    if limit >= text.len() {
        return text;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    text.get(..end).unwrap_or_default()
}
