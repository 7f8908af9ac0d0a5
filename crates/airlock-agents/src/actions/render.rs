//! Render typed actions into the exact strings shown to the model.
//!
//! The response parser resolves LLM text against these strings, so the
//! spellings here are part of the engine's contract with the prompt.

use std::collections::BTreeMap;

use airlock_types::{Action, PlayerId, VoteChoice};
use airlock_ship::ShipMap;

use crate::player::Player;

/// Render one legal action instance from the actor's point of view.
pub fn render_action(
    action: &Action,
    actor: &Player,
    map: &ShipMap,
    roster: &BTreeMap<PlayerId, Player>,
) -> String {
    let player_name =
        |id: PlayerId| roster.get(&id).map_or_else(|| id.to_string(), |p| p.name.clone());

    match action {
        Action::Move { to } => format!(
            "MOVE from {} to {}",
            map.room_name(actor.room),
            map.room_name(*to)
        ),
        Action::Vent { to } => format!(
            "VENT from {} to {}",
            map.room_name(actor.room),
            map.room_name(*to)
        ),
        Action::CompleteTask { task } => {
            let Some(task) = actor.task(*task) else {
                return String::from("COMPLETE TASK");
            };
            if task.remaining == 1 && task.max_duration > 1 {
                format!("COMPLETE TASK - {} (FINAL TURN - completes this turn!)", task.name)
            } else if task.in_progress() {
                format!(
                    "COMPLETE TASK - {} ({} turns remaining - stay in this room)",
                    task.name, task.remaining
                )
            } else if task.max_duration > 1 {
                format!(
                    "COMPLETE TASK - {} (requires {} turns - you must stay in this room)",
                    task.name, task.max_duration
                )
            } else {
                format!("COMPLETE TASK - {}", task.name)
            }
        }
        Action::CompleteFakeTask { task } => {
            let name = actor.task(*task).map_or("task", |t| t.name.as_str());
            format!("COMPLETE FAKE TASK - {name}")
        }
        Action::Kill { victim } => format!("KILL {}", player_name(*victim)),
        Action::Sabotage { kind } => format!("SABOTAGE {kind}"),
        Action::FixSabotage { kind } => format!(
            "FIX SABOTAGE - Repair {kind} (at {})",
            map.room_name(actor.room)
        ),
        Action::CallMeeting => format!(
            "CALL MEETING using the emergency button at {}",
            map.room_name(actor.room)
        ),
        Action::ReportBody => format!("REPORT DEAD BODY at {}", map.room_name(actor.room)),
        Action::Speak { message } => format!("SPEAK: {message}"),
        Action::Vote { choice } => match choice {
            VoteChoice::Player(target) => format!("VOTE {}", player_name(*target)),
            VoteChoice::Skip => String::from("VOTE SKIP"),
        },
        Action::ViewMonitor { room } => format!("VIEW MONITOR - {}", map.room_name(*room)),
    }
}

/// Render the witness-facing text of an action.
///
/// This is what co-located players observe, which deliberately differs from
/// the actor-facing repr: task work looks the same whether real or fake, and
/// only the completing turn of a visual task produces distinguishable proof.
pub fn action_text(
    action: &Action,
    actor: &Player,
    map: &ShipMap,
    roster: &BTreeMap<PlayerId, Player>,
) -> String {
    match action {
        Action::CompleteTask { task } => {
            let Some(task) = actor.task(*task) else {
                return String::from("Seemingly doing task");
            };
            if task.is_visual && task.is_complete() {
                format!("Visibly completing task {} (VISUAL CONFIRMATION)", task.name)
            } else if task.remaining > 0 {
                format!(
                    "Working on task {} ({} turn{} left)",
                    task.name,
                    task.remaining,
                    if task.remaining > 1 { "s" } else { "" }
                )
            } else {
                String::from("Seemingly doing task")
            }
        }
        Action::CompleteFakeTask { .. } => String::from("Seemingly doing task"),
        Action::Sabotage { kind } => format!("Triggered {kind} sabotage"),
        Action::FixSabotage { kind } => format!("Fixed {kind} sabotage"),
        other => render_action(other, actor, map, roster),
    }
}
