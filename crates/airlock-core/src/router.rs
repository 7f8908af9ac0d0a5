//! The message router: sole writer of every player's observation stream.
//!
//! Every event -- a resolved action, a speech, a system broadcast -- is
//! routed here. The router computes the recipient set under line of sight
//! and writes classified entries into each recipient's `MemoryState`:
//! co-located witnesses get verified observations (crime-tagged for kills
//! and vents), the victim of a kill hears nothing, meeting speech lands as
//! hearsay for everyone else, and system broadcasts are verified for all
//! living players.

use airlock_types::{ObservationKind, Phase, PlayerId, RoomId};
use tracing::debug;

use crate::state::GameState;

/// The eyewitness marker attached to crime observations.
pub const EYEWITNESS_TAG: &str = "[CONFIRMED EYEWITNESS]";

/// Render the standard observation line for a resolved action.
pub fn action_line(state: &GameState, actor_name: &str, action_text: &str) -> String {
    match state.phase {
        Phase::Task => format!(
            "Timestep {}: [task] {actor_name} {action_text}",
            state.timestep
        ),
        Phase::Meeting => {
            let round = state
                .config
                .discussion_rounds
                .saturating_sub(state.discussion_rounds_left);
            format!(
                "Timestep {}: [meeting phase - round {round}] {actor_name} {action_text}",
                state.timestep
            )
        }
    }
}

/// Deliver a resolved action to everyone who can see it.
///
/// Recipients are the living players co-located with the action's origin or
/// destination room (post-movement positions). Witnesses in the origin room
/// of a KILL or VENT get the eyewitness crime tag. The victim of a kill is
/// excluded -- they do not "hear" their killer announced. The actor gets a
/// verified record of their own action.
#[allow(clippy::too_many_arguments)]
pub fn deliver_action(
    state: &mut GameState,
    actor: PlayerId,
    origin: RoomId,
    destination: Option<RoomId>,
    line: &str,
    is_crime: bool,
    victim: Option<PlayerId>,
    visual_proof: bool,
) {
    let tick = state.timestep;

    // Actor's own verified record.
    if let Some(player) = state.players.get_mut(&actor) {
        let own = format!("You did this: {line}");
        player
            .memory
            .add_verified(tick, own, origin, ObservationKind::Visual);
    }

    let recipients: Vec<PlayerId> = state
        .players
        .values()
        .filter(|p| p.id != actor && p.alive)
        .filter(|p| Some(p.id) != victim)
        .filter(|p| p.room == origin || destination.is_some_and(|d| p.room == d))
        .map(|p| p.id)
        .collect();

    for id in recipients {
        let Some(recipient) = state.players.get_mut(&id) else {
            continue;
        };
        let in_origin = recipient.room == origin;
        let message = if is_crime && in_origin {
            format!(
                "{EYEWITNESS_TAG} {line} -- You SAW this happen. This is 100% proof, NOT a theory."
            )
        } else if visual_proof {
            format!(
                "[VISUAL TASK CONFIRMED] {line} -- You SAW them complete a visual task. This PROVES they are a Crewmate."
            )
        } else {
            line.to_owned()
        };
        let room = recipient.room;
        debug!(recipient = %recipient.name, %message, "routing observation");
        recipient.memory.classify_observation(tick, &message, room);
    }
}

/// Broadcast a system note to every living player as a verified entry.
pub fn broadcast_system(state: &mut GameState, message: &str) {
    let tick = state.timestep;
    for player in state.players.values_mut() {
        if !player.alive {
            continue;
        }
        let room = player.room;
        player.memory.classify_observation(tick, message, room);
    }
}

/// Deliver a meeting utterance.
///
/// Every other living player receives it as hearsay; the speaker's own
/// claims ring records the raw message for later self-consistency prompts.
pub fn deliver_speech(state: &mut GameState, speaker: PlayerId, round: u32, message: &str) {
    let tick = state.timestep;
    let speaker_name = state
        .players
        .get(&speaker)
        .map_or_else(String::new, |p| p.name.clone());
    let line = format!("[Discussion Round {round}] {speaker_name} said: \"{message}\"");

    for player in state.players.values_mut() {
        if player.id == speaker || !player.alive {
            continue;
        }
        player.memory.add_hearsay(tick, speaker_name.clone(), line.clone());
    }

    if let Some(player) = state.players.get_mut(&speaker) {
        player.memory.record_own_statement(tick, message);
    }
}
