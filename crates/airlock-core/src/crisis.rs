//! Crisis dispatch: who answers a critical sabotage alarm.
//!
//! While OXYGEN or REACTOR is active, the two living crewmates nearest the
//! fix room (by walking distance) are tagged as responders; everyone else is
//! told to ignore the alarm and keep working. Roles are re-evaluated every
//! tick so a responder's death promotes the next-nearest crewmate.

use std::collections::BTreeSet;

use airlock_types::{CrisisRole, Intent, PlayerId, Role, SabotageKind};
use tracing::debug;

use crate::state::GameState;

/// How many crewmates are dispatched to a crisis.
const RESPONDER_COUNT: usize = 2;

/// Re-evaluate crisis roles for an active critical sabotage.
pub fn crisis_dispatch(state: &mut GameState, kind: SabotageKind) {
    let Ok(fix_room) = state.map.fix_room(kind) else {
        return;
    };

    let mut candidates: Vec<(u32, PlayerId)> = state
        .players
        .values()
        .filter(|p| p.alive && p.role == Role::Crewmate)
        .map(|p| {
            let distance = state
                .distances
                .distance(p.room, fix_room)
                .unwrap_or(u32::MAX);
            (distance, p.id)
        })
        .collect();
    candidates.sort_unstable();

    let responders: BTreeSet<PlayerId> = candidates
        .iter()
        .take(RESPONDER_COUNT)
        .map(|(_, id)| *id)
        .collect();
    debug!(?kind, ?responders, "crisis dispatch");

    for player in state.players.values_mut() {
        if !player.alive || player.role == Role::Impostor {
            player.memory.crisis_role = None;
            continue;
        }
        if responders.contains(&player.id) {
            player.memory.crisis_role = Some(CrisisRole::CrisisResponder);
            player.memory.current_intent = Intent::CrisisResponse;
        } else {
            // Intent is left alone: non-responders stay on their tasks.
            player.memory.crisis_role = Some(CrisisRole::IgnoreAlarm);
        }
    }
}

/// Clear every crisis role once no critical sabotage remains.
pub fn clear_crisis_roles(state: &mut GameState) {
    for player in state.players.values_mut() {
        player.memory.crisis_role = None;
        if player.memory.current_intent == Intent::CrisisResponse {
            player.memory.current_intent = Intent::TaskExecution;
        }
    }
}
