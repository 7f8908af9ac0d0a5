//! Perception assembly: the LOS-filtered world view for one decision.
//!
//! A perception is a pure function of the player's own state (memory,
//! presence log, tasks) and the post-snapshot occupancy. Sabotage degrades
//! it: LIGHTS redacts visible-player names for crewmates, COMMS hides the
//! task list and task bar. Nothing outside the player's epistemic boundary
//! is ever included -- the LOS denial rule is enforced here and in the
//! router, nowhere else.

use airlock_agents::{Player, render_action};
use airlock_types::{
    Action, DeceptionLedger, FakeMemoryEntry, HearsayEntry, LegalAction, MeetingContext,
    MeetingStage, MemoryView, OwnClaim, Perception, Phase, PlayerId, PresenceEntry, Role,
    RoomView, RosterEntry, SabotageKind, SelfView, TaskStatus, TaskView, VerifiedObservation,
};

use crate::state::GameState;

/// Number of recent action-history lines surfaced in prompts.
const ACTION_HISTORY_WINDOW: usize = 6;

/// Danger score at which the crewmate safety briefing is injected.
pub const DANGER_PROMPT_THRESHOLD: u8 = 30;

/// Assemble the perception payload for one player.
///
/// `legal` is the already-computed legal action set; it is rendered into
/// prompt-facing reprs here so the parser and the prompt agree on spelling.
pub fn assemble_perception(
    state: &GameState,
    id: PlayerId,
    voting: bool,
    legal: Vec<Action>,
) -> Option<Perception> {
    let player = state.players.get(&id)?;

    let meeting = (state.phase == Phase::Meeting).then(|| {
        let round = state
            .config
            .discussion_rounds
            .saturating_sub(state.discussion_rounds_left);
        MeetingContext {
            stage: MeetingStage::from_round(round),
            round,
            rounds_total: state.config.discussion_rounds,
            caller: state
                .meeting_caller
                .and_then(|caller| state.players.get(&caller))
                .map(|p| p.name.clone()),
            voting,
        }
    });

    let legal_actions: Vec<LegalAction> = legal
        .into_iter()
        .map(|action| LegalAction {
            repr: render_action(&action, player, &state.map, &state.players),
            action,
        })
        .collect();

    let lights_out = state.active_sabotages.contains_key(&SabotageKind::Lights)
        && player.role != Role::Impostor;
    let visible_players = if lights_out {
        Vec::new()
    } else {
        state
            .living_in_room(player.room, Some(id))
            .into_iter()
            .filter_map(|other| state.players.get(&other))
            .map(|p| p.name.clone())
            .collect()
    };

    let dead_bodies = state
        .dead_bodies
        .iter()
        .filter(|b| b.room == player.room && !b.reported)
        .filter_map(|b| state.players.get(&b.player))
        .map(|p| p.name.clone())
        .collect();

    let comms_jammed = state.active_sabotages.contains_key(&SabotageKind::Comms)
        && player.role != Role::Impostor;
    let tasks = if comms_jammed {
        Vec::new()
    } else {
        player.tasks.iter().map(|task| task_view(state, player, task)).collect()
    };

    let critical_fix_room = state
        .critical_sabotage()
        .and_then(|kind| state.map.fix_room(kind).ok())
        .map(|room| state.map.room_name(room).to_owned());

    Some(Perception {
        tick: state.timestep,
        max_timesteps: state.config.max_timesteps,
        phase: state.phase,
        meeting,
        self_state: SelfView {
            id,
            name: player.name.clone(),
            color: player.color.clone(),
            role: player.role,
            alive: player.alive,
            death_cause: player.death_cause,
            death_timestep: player.death_timestep,
            room: state.map.room_name(player.room).to_owned(),
            previous_room: player
                .previous_room
                .map(|room| state.map.room_name(room).to_owned()),
            kill_cooldown: (player.role == Role::Impostor).then_some(player.kill_cooldown),
        },
        room: RoomView {
            room: state.map.room_name(player.room).to_owned(),
            visible_players,
            dead_bodies,
            lights_out,
        },
        roster: state
            .turn_order
            .iter()
            .filter_map(|pid| state.players.get(pid))
            .map(|p| RosterEntry {
                name: p.name.clone(),
                alive: p.alive,
                death_cause: p.death_cause,
                death_timestep: p.death_timestep,
            })
            .collect(),
        presence_log: player
            .presence_log
            .iter()
            .map(|entry| PresenceEntry {
                tick: entry.tick,
                room: state.map.room_name(entry.room).to_owned(),
                players_seen: entry
                    .players_seen
                    .iter()
                    .filter_map(|pid| state.players.get(pid))
                    .map(|p| p.name.clone())
                    .collect(),
            })
            .collect(),
        memory: memory_view(state, player),
        tasks,
        comms_jammed,
        task_bar_pct: (!comms_jammed).then(|| state.task_bar_pct()),
        active_sabotages: state.active_sabotages.keys().copied().collect(),
        critical_fix_room,
        danger_score: danger_score(state, player),
        action_history: player
            .action_history
            .iter()
            .rev()
            .take(ACTION_HISTORY_WINDOW)
            .rev()
            .map(|record| format!("Timestep {}: [{}] {}", record.tick, record.phase, record.line))
            .collect(),
        map_brief: state.map.brief(),
        legal_actions,
        deception: (player.role == Role::Impostor).then(|| deception_ledger(state, player)),
    })
}

/// Project the structured memory into its prompt-facing view.
fn memory_view(state: &GameState, player: &Player) -> MemoryView {
    MemoryView {
        verified: player
            .memory
            .verified()
            .iter()
            .map(|entry| VerifiedObservation {
                tick: entry.tick,
                event: entry.event.clone(),
                kind: entry.kind,
                location: state.map.room_name(entry.room).to_owned(),
            })
            .collect(),
        hearsay: player
            .memory
            .social()
            .iter()
            .map(|entry| HearsayEntry {
                tick: entry.tick,
                speaker: entry.speaker.clone(),
                claim: entry.claim.clone(),
            })
            .collect(),
        own_claims: player
            .memory
            .own_claims()
            .iter()
            .map(|entry| OwnClaim {
                tick: entry.tick,
                claim: entry.claim.clone(),
            })
            .collect(),
        intent: player.memory.current_intent,
        task_commitment: player.memory.task_commitment,
        crisis_role: player.memory.crisis_role,
    }
}

/// Render one task with its status and a walk-path hint.
fn task_view(state: &GameState, player: &Player, task: &airlock_types::Task) -> TaskView {
    let status = if task.is_complete() {
        TaskStatus::Done
    } else if task.in_progress() {
        TaskStatus::InProgress
    } else {
        TaskStatus::Pending
    };
    let path = if status == TaskStatus::Done {
        // No path for finished tasks: prevents revisit loops.
        Vec::new()
    } else {
        airlock_ship::shortest_path(&state.map, player.room, task.room)
            .into_iter()
            .map(|room| state.map.room_name(room).to_owned())
            .collect()
    };
    TaskView {
        name: task.name.clone(),
        location: state.map.room_name(task.room).to_owned(),
        status,
        turns_remaining: task.in_progress().then_some(task.remaining),
        turns_required: task.max_duration,
        is_visual: task.is_visual,
        path,
    }
}

/// The impostor's deception ledger, resolved to room names.
fn deception_ledger(state: &GameState, player: &Player) -> DeceptionLedger {
    DeceptionLedger {
        kill_room: player
            .deception
            .kill_room
            .map(|room| state.map.room_name(room).to_owned()),
        victim: player
            .deception
            .victim
            .and_then(|victim| state.players.get(&victim))
            .map(|p| p.name.clone()),
        public_alibi: player
            .deception
            .public_alibi
            .map(|room| state.map.room_name(room).to_owned()),
        fake_memory: player
            .memory
            .fake_memory()
            .iter()
            .map(|entry| FakeMemoryEntry {
                turn: entry.turn,
                room: state.map.room_name(entry.room).to_owned(),
                activity: entry.activity.clone(),
            })
            .collect(),
    }
}

/// Crewmate self-preservation score, 0-100.
///
/// Alone in a room +30, any sabotage +20 (+15 more when critical), an
/// unreported body here +25, three or fewer players alive +15. Impostors
/// and the dead score zero.
pub fn danger_score(state: &GameState, player: &Player) -> u8 {
    if player.role == Role::Impostor || !player.alive {
        return 0;
    }
    let mut score = 0_u32;
    if state.living_in_room(player.room, Some(player.id)).is_empty() {
        score = score.saturating_add(30);
    }
    if !state.active_sabotages.is_empty() {
        score = score.saturating_add(20);
        if state.critical_sabotage().is_some() {
            score = score.saturating_add(15);
        }
    }
    if state.unreported_body_in(player.room) {
        score = score.saturating_add(25);
    }
    let alive = state.living_players().len();
    if alive <= 3 {
        score = score.saturating_add(15);
    }
    u8::try_from(score.min(100)).unwrap_or(100)
}
