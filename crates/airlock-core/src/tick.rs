//! The task-phase tick resolver.
//!
//! Correctness depends on the stage ordering:
//!
//! 1. **Pre-check forced reports** -- anyone starting the tick on an
//!    unreported body reports it immediately; their intended action is
//!    discarded and the meeting starts.
//! 2. **Decide** -- every agent (ghosts included) picks an action against
//!    the tick-start world. No state changes.
//! 3. **Resolve movement** -- all MOVEs and VENTs land.
//! 4. **Snapshot** -- occupancy is rebuilt so observers see the
//!    post-movement world.
//! 5. **Resolve non-movement** -- kills are re-validated against the
//!    post-movement world (a target that moved away is spared; a player who
//!    moved in becomes a witness); meeting triggers short-circuit the rest.
//! 6. **Bookkeeping** -- presence logs, memory updates, commitment decay,
//!    sabotage timers, crisis dispatch.

use airlock_agents::{action_text, legal_actions, render_action};
use airlock_types::{
    Action, ActionKind, DeadBody, DeathCause, ObservationKind, Phase, PlayerId, Role, SabotageKind,
};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom as _;
use tracing::{debug, info, warn};

use crate::activity::{ActivitySink, make_record};
use crate::crisis::{clear_crisis_roles, crisis_dispatch};
use crate::decision::{DecisionRequest, DecisionSource, normalize_decision};
use crate::error::EngineError;
use crate::perception::assemble_perception;
use crate::router::{action_line, broadcast_system, deliver_action};
use crate::state::GameState;

/// What a task tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whether this tick transitioned into a meeting.
    pub meeting_started: bool,
}

/// Execute one task-phase tick.
pub fn run_task_tick(
    state: &mut GameState,
    source: &mut dyn DecisionSource,
    sink: &mut dyn ActivitySink,
    rng: &mut StdRng,
) -> Result<TickOutcome, EngineError> {
    let tick = state.timestep;
    info!(tick, "task tick started");

    // --- Stage 1: forced body reports ---
    if let Some(reporter) = forced_report_check(state, sink) {
        debug!(tick, reporter = %reporter, "forced report fired");
        advance_clock(state);
        return Ok(TickOutcome {
            meeting_started: true,
        });
    }

    // --- Stage 2: decide ---
    let decisions = decide_stage(state, source)?;

    // --- Stage 3: resolve movement ---
    for (id, action) in &decisions {
        if action.kind().is_movement() {
            resolve_movement(state, *id, action, sink);
        }
    }

    // --- Stage 4: snapshot ---
    state.rebuild_occupancy();

    // --- Stage 5: resolve non-movement actions ---
    for (id, action) in &decisions {
        if action.kind().is_movement() {
            continue;
        }
        resolve_effect(state, *id, action, sink, rng);
        if state.phase == Phase::Meeting {
            // Meeting triggers short-circuit the remaining actions.
            break;
        }
    }

    let meeting_started = state.phase == Phase::Meeting;

    // --- Stage 6: bookkeeping ---
    if !meeting_started {
        presence_bookkeeping(state);
    }
    advance_clock(state);

    Ok(TickOutcome { meeting_started })
}

/// Stage 1: synthesize a REPORT for anyone standing on an unreported body.
fn forced_report_check(state: &mut GameState, sink: &mut dyn ActivitySink) -> Option<PlayerId> {
    let reporter = state.turn_order.iter().copied().find(|id| {
        state
            .players
            .get(id)
            .is_some_and(|p| p.alive && state.unreported_body_in(p.room))
    })?;

    let tick = state.timestep;
    let (room, room_name) = {
        let player = state.players.get(&reporter)?;
        (player.room, state.map.room_name(player.room).to_owned())
    };

    if let Some(player) = state.players.get_mut(&reporter) {
        let note = format!(
            "[SYSTEM] You discovered a dead body in {room_name}! Reporting immediately."
        );
        player.memory.classify_observation(tick, &note, room);
    }

    let repr = format!("REPORT DEAD BODY at {room_name}");
    sink.record(&make_record(state, reporter, repr.clone()));
    append_history(state, reporter, &repr);
    execute_meeting_trigger(state, reporter, false);
    Some(reporter)
}

/// Stage 2: collect one normalized decision per player.
fn decide_stage(
    state: &mut GameState,
    source: &mut dyn DecisionSource,
) -> Result<Vec<(PlayerId, Action)>, EngineError> {
    // Kill cooldowns tick down before legality is computed, so an impostor
    // whose cooldown expires this tick may kill this tick.
    for player in state.players.values_mut() {
        if player.role == Role::Impostor {
            player.kill_cooldown = player.kill_cooldown.saturating_sub(1);
        }
    }

    state.rebuild_occupancy();

    let mut requests = Vec::new();
    let mut legal_sets = Vec::new();
    for id in state.turn_order.clone() {
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        let ctx = state.legality_ctx(false);
        let legal = legal_actions(&ctx, player);
        if legal.is_empty() {
            continue;
        }
        let Some(perception) = assemble_perception(state, id, false, legal.clone()) else {
            continue;
        };
        requests.push(DecisionRequest {
            player: id,
            perception,
        });
        legal_sets.push((id, legal));
    }

    let mut proposals = source.collect(&requests)?;

    let mut decisions = Vec::new();
    for (id, legal) in legal_sets {
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        let proposed = proposals.remove(&id);
        if let Some(action) = normalize_decision(player, &legal, proposed) {
            decisions.push((id, action));
        }
    }
    Ok(decisions)
}

/// Stage 3: apply one MOVE or VENT.
fn resolve_movement(
    state: &mut GameState,
    id: PlayerId,
    action: &Action,
    sink: &mut dyn ActivitySink,
) {
    let Some(to) = action.destination() else {
        return;
    };
    let Some(player) = state.players.get(&id) else {
        return;
    };
    let origin = player.room;
    let repr = render_action(action, player, &state.map, &state.players);
    let text = action_text(action, player, &state.map, &state.players);
    let line = action_line(state, &player.name, &text);
    let is_vent = action.kind() == ActionKind::Vent;
    let is_impostor = player.role == Role::Impostor;

    sink.record(&make_record(state, id, repr.clone()));
    state.camera_record.insert(id, repr.clone());

    if let Some(player) = state.players.get_mut(&id) {
        player.relocate(to);
    }
    append_history(state, id, &repr);

    // Phantom alibi: impostor movements feed the fake-memory track. A VENT
    // is covered by the standing alibi room; a MOVE is safe to admit.
    if is_impostor {
        let tick = state.timestep;
        if let Some(player) = state.players.get_mut(&id) {
            let fake_room = if is_vent {
                player.deception.public_alibi.unwrap_or(origin)
            } else {
                to
            };
            let activity = if is_vent {
                String::from("walking around")
            } else {
                format!("heading to {}", state.map.room_name(to))
            };
            player.memory.record_fake(tick, fake_room, activity);
        }
    }

    // Witnesses in the origin room of a VENT get the crime tag.
    deliver_action(state, id, origin, Some(to), &line, is_vent, None, false);
}

/// Stage 5: apply one non-movement action.
fn resolve_effect(
    state: &mut GameState,
    id: PlayerId,
    action: &Action,
    sink: &mut dyn ActivitySink,
    rng: &mut StdRng,
) {
    let Some(player) = state.players.get(&id) else {
        return;
    };
    let repr = render_action(action, player, &state.map, &state.players);
    state.camera_record.insert(id, repr.clone());

    match action {
        Action::Kill { victim } => resolve_kill(state, id, *victim, &repr, sink, rng),
        Action::CompleteTask { task } | Action::CompleteFakeTask { task } => {
            resolve_task_work(state, id, action, *task, &repr, sink);
        }
        Action::Sabotage { kind } => resolve_sabotage(state, id, *kind, &repr, sink),
        Action::FixSabotage { kind } => resolve_fix(state, id, *kind, &repr, sink),
        Action::CallMeeting => {
            sink.record(&make_record(state, id, repr.clone()));
            append_history(state, id, &repr);
            execute_meeting_trigger(state, id, true);
        }
        Action::ReportBody => {
            sink.record(&make_record(state, id, repr.clone()));
            append_history(state, id, &repr);
            execute_meeting_trigger(state, id, false);
        }
        Action::ViewMonitor { room } => resolve_monitor(state, id, *room, &repr, sink),
        Action::Move { .. } | Action::Vent { .. } => {}
        Action::Speak { .. } | Action::Vote { .. } => {
            // Meeting-only actions cannot be legal here; the guards upstream
            // already rewrote them.
            warn!(player = %id, kind = action.kind().name(), "meeting action reached task resolution");
        }
    }
}

/// Resolve a KILL with its physics re-validation.
///
/// The victim may have moved away in stage 3, or already be dead from an
/// earlier kill this tick; both spare them and log a rejected attempt.
fn resolve_kill(
    state: &mut GameState,
    killer: PlayerId,
    victim: PlayerId,
    repr: &str,
    sink: &mut dyn ActivitySink,
    rng: &mut StdRng,
) {
    let tick = state.timestep;
    let killer_room = match state.players.get(&killer) {
        Some(p) => p.room,
        None => return,
    };

    let valid = state
        .players
        .get(&victim)
        .is_some_and(|v| v.alive && v.room == killer_room);
    if !valid {
        warn!(%killer, %victim, "kill rejected at resolution: target dead or moved away");
        let rejected = format!("[REJECTED] {repr}");
        sink.record(&make_record(state, killer, rejected.clone()));
        append_history(state, killer, &rejected);
        return;
    }

    // Commit the irreversible transition.
    if let Some(target) = state.players.get_mut(&victim)
        && let Err(err) = target.mark_dead(tick, DeathCause::Killed)
    {
        warn!(%err, "kill target transition failed");
        return;
    }
    state.dead_bodies.push(DeadBody {
        player: victim,
        room: killer_room,
        reported: false,
    });

    let cooldown = state.config.kill_cooldown;
    let witness_names: Vec<String> = state
        .living_in_room(killer_room, Some(killer))
        .iter()
        .filter_map(|w| state.players.get(w))
        .map(|p| p.name.clone())
        .collect();

    // Deception ledger: pick a walk-adjacent alibi room (never the kill room,
    // never the button room -- too much traffic to survive scrutiny).
    let alibi = state
        .map
        .walk_neighbors(killer_room)
        .into_iter()
        .filter(|room| *room != state.map.button_room())
        .choose(rng)
        .or_else(|| state.map.walk_neighbors(killer_room).into_iter().next());

    let (line, fake_activity) = {
        let Some(player) = state.players.get(&killer) else {
            return;
        };
        let text = action_text(
            &Action::Kill { victim },
            player,
            &state.map,
            &state.players,
        );
        let fake_task = player
            .tasks
            .iter()
            .find(|t| !t.is_complete())
            .map_or_else(|| String::from("doing tasks"), |t| format!("doing {}", t.name));
        (action_line(state, &player.name, &text), fake_task)
    };

    if let Some(player) = state.players.get_mut(&killer) {
        player.kill_cooldown = cooldown;
        player.deception.kill_room = Some(killer_room);
        player.deception.victim = Some(victim);
        player.deception.public_alibi = alibi;
        if let Some(alibi_room) = alibi {
            player.memory.record_fake(tick, alibi_room, fake_activity);
        }
    }

    info!(
        %killer,
        %victim,
        room = state.map.room_name(killer_room),
        witnesses = ?witness_names,
        "kill resolved"
    );
    sink.record(&make_record(
        state,
        killer,
        format!(
            "{repr} ||| Location: {}, Witness: {witness_names:?}",
            state.map.room_name(killer_room)
        ),
    ));
    append_history(state, killer, repr);

    // Witnesses get the eyewitness crime tag; the victim hears nothing.
    deliver_action(state, killer, killer_room, None, &line, true, Some(victim), false);
}

/// Resolve COMPLETE TASK / COMPLETE FAKE TASK.
fn resolve_task_work(
    state: &mut GameState,
    id: PlayerId,
    action: &Action,
    task: airlock_types::TaskId,
    repr: &str,
    sink: &mut dyn ActivitySink,
) {
    let tick = state.timestep;
    let is_fake = action.kind() == ActionKind::CompleteFakeTask;

    if let Some(player) = state.players.get_mut(&id)
        && let Ok(task_state) = player.task_mut(task)
        && !task_state.is_complete()
    {
        task_state.advance();
    }

    let Some(player) = state.players.get(&id) else {
        return;
    };
    let room = player.room;
    let text = action_text(action, player, &state.map, &state.players);
    let line = action_line(state, &player.name, &text);
    let visual_proof = !is_fake
        && player
            .task(task)
            .is_some_and(|t| t.is_visual && t.is_complete());

    sink.record(&make_record(state, id, repr.to_owned()));
    append_history(state, id, repr);

    // Impostor cover story: fake work claims the task by name.
    if is_fake {
        let activity = state
            .players
            .get(&id)
            .and_then(|p| p.task(task))
            .map_or_else(|| String::from("doing tasks"), |t| format!("completing {}", t.name));
        if let Some(player) = state.players.get_mut(&id) {
            player.memory.record_fake(tick, room, activity);
        }
    }

    deliver_action(state, id, room, None, &line, false, None, visual_proof);
}

/// Resolve SABOTAGE: activate the timer, start the cooldown, alarm the ship.
fn resolve_sabotage(
    state: &mut GameState,
    id: PlayerId,
    kind: SabotageKind,
    repr: &str,
    sink: &mut dyn ActivitySink,
) {
    state
        .active_sabotages
        .insert(kind, kind.duration_ticks());
    state.sabotage_cooldown = state.config.sabotage_cooldown;

    sink.record(&make_record(state, id, repr.to_owned()));
    append_history(state, id, repr);

    let detail = match kind {
        SabotageKind::Lights => {
            "Vision is reduced -- you CANNOT identify other players until lights are restored!"
        }
        SabotageKind::Oxygen => {
            "Oxygen is depleting! Crewmates must go to O2 to fix it or everyone dies!"
        }
        SabotageKind::Reactor => {
            "Reactor is melting down! Crewmates must go to Reactor to fix it or everyone dies!"
        }
        SabotageKind::Comms => {
            "Communications are down -- task list and task bar are HIDDEN until fixed!"
        }
    };
    let alarm = format!("[SABOTAGE] {kind} has been sabotaged! {detail}");
    broadcast_system(state, &alarm);

    if kind.is_critical() {
        crisis_dispatch(state, kind);
    }
}

/// Resolve FIX SABOTAGE.
fn resolve_fix(
    state: &mut GameState,
    id: PlayerId,
    kind: SabotageKind,
    repr: &str,
    sink: &mut dyn ActivitySink,
) {
    if state.active_sabotages.remove(&kind).is_none() {
        return;
    }
    sink.record(&make_record(state, id, repr.to_owned()));
    append_history(state, id, repr);

    let name = state
        .players
        .get(&id)
        .map_or_else(String::new, |p| p.name.clone());
    let note = format!("[SYSTEM] {name} has repaired the {kind} sabotage! Crisis averted.");
    broadcast_system(state, &note);
}

/// Resolve VIEW MONITOR: reveal recent entries/exits for the chosen room.
fn resolve_monitor(
    state: &mut GameState,
    id: PlayerId,
    room: airlock_types::RoomId,
    repr: &str,
    sink: &mut dyn ActivitySink,
) {
    let tick = state.timestep;
    let room_name = state.map.room_name(room).to_owned();
    let mut observations = Vec::new();

    for other in state.turn_order.clone() {
        let Some(player) = state.players.get(&other) else {
            continue;
        };
        if !player.alive {
            continue;
        }
        let last_action = state
            .camera_record
            .get(&other)
            .cloned()
            .unwrap_or_else(|| String::from("stand quietly and do nothing"));
        if player.room == room {
            let rendered = if last_action.starts_with("MOVE from ") {
                format!("enter {room_name}")
            } else {
                last_action
            };
            observations.push(format!("({}): {rendered}", player.name));
        } else if last_action.starts_with(&format!("MOVE from {room_name} to ")) {
            observations.push(format!("({}): leave {room_name}", player.name));
        }
    }

    let body = if observations.is_empty() {
        String::from("No one here")
    } else {
        observations.join(", ")
    };
    let message = format!("Monitor Record: {{Location: {room_name}, Observation: {{{body}}}}}");

    sink.record(&make_record(state, id, repr.to_owned()));
    append_history(state, id, repr);
    if let Some(player) = state.players.get_mut(&id) {
        let own_room = player.room;
        player
            .memory
            .add_verified(tick, message, own_room, ObservationKind::Visual);
    }
}

/// Execute a CALL MEETING / REPORT DEAD BODY transition.
///
/// Marks every body reported and flips the phase; the meeting itself runs on
/// the next step. Only the emergency button burns button budget.
fn execute_meeting_trigger(state: &mut GameState, caller: PlayerId, via_button: bool) {
    if via_button {
        state.button_uses = state.button_uses.saturating_add(1);
    }
    for body in &mut state.dead_bodies {
        body.reported = true;
    }
    state.meeting_caller = Some(caller);
    state.phase = Phase::Meeting;
}

/// Stage 6: presence log, structured memory refresh, commitment update.
fn presence_bookkeeping(state: &mut GameState) {
    let tick = state.timestep;
    for id in state.turn_order.clone() {
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        if !player.alive {
            continue;
        }
        let room = player.room;
        let room_name = state.map.room_name(room).to_owned();
        let seen = state.living_in_room(room, Some(id));
        let seen_names: Vec<String> = seen
            .iter()
            .filter_map(|other| state.players.get(other))
            .map(|p| p.name.clone())
            .collect();
        let bodies_here: Vec<String> = state
            .dead_bodies
            .iter()
            .filter(|b| b.room == room && !b.reported)
            .filter_map(|b| state.players.get(&b.player))
            .map(|p| p.name.clone())
            .collect();
        let last_action = state
            .players
            .get(&id)
            .and_then(|p| p.action_history.last())
            .filter(|record| record.tick == tick)
            .map_or_else(|| String::from("-"), |record| record.line.clone());

        let Some(player) = state.players.get_mut(&id) else {
            continue;
        };
        player.presence_log.push(airlock_agents::PresenceRecord {
            tick,
            room,
            players_seen: seen,
        });
        player.memory.record_location(room, tick, last_action);
        if !seen_names.is_empty() {
            let note = format!("Saw {} in {room_name}", seen_names.join(", "));
            player
                .memory
                .add_verified(tick, note, room, ObservationKind::Visual);
        }
        if !bodies_here.is_empty() {
            let note = format!("Dead body found: {} in {room_name}", bodies_here.join(", "));
            player
                .memory
                .add_verified(tick, note, room, ObservationKind::VisualCrime);
        }
        let tasks = player.tasks.clone();
        player.memory.update_task_commitment(room, &tasks);
    }
}

/// Shared end-of-step clock work: advance the tick, age sabotage timers
/// (auto-repairing expired ones), and refresh crisis dispatch.
pub fn advance_clock(state: &mut GameState) {
    state.timestep = state.timestep.saturating_add(1);
    state.sabotage_cooldown = state.sabotage_cooldown.saturating_sub(1);

    let expired: Vec<SabotageKind> = state
        .active_sabotages
        .iter()
        .filter(|(_, timer)| **timer <= 1)
        .map(|(kind, _)| *kind)
        .collect();
    for kind in expired {
        state.active_sabotages.remove(&kind);
        let note = format!("[SYSTEM] {kind} sabotage has been automatically repaired.");
        broadcast_system(state, &note);
    }
    for timer in state.active_sabotages.values_mut() {
        *timer = timer.saturating_sub(1);
    }

    match state.critical_sabotage() {
        Some(kind) => crisis_dispatch(state, kind),
        None => clear_crisis_roles(state),
    }
}

/// Append a rendered line to the player's own action history.
fn append_history(state: &mut GameState, id: PlayerId, line: &str) {
    let tick = state.timestep;
    let phase = match state.phase {
        Phase::Task => String::from("task phase"),
        Phase::Meeting => {
            let round = state
                .config
                .discussion_rounds
                .saturating_sub(state.discussion_rounds_left);
            format!("meeting phase - round {round}")
        }
    };
    if let Some(player) = state.players.get_mut(&id) {
        player.action_history.push(airlock_agents::ActionRecord {
            tick,
            phase,
            line: line.to_owned(),
        });
    }
}
