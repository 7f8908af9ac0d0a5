//! The meeting phase: staged debate, then the vote.
//!
//! Discussion runs a fixed number of rounds (testimony, accusation/defense,
//! final arguments). Speakers take turns by dynamic priority; every
//! utterance is broadcast as hearsay and, after the round, condensed into a
//! single summary entry per listener so context cannot grow without bound.
//! Voting follows: each living player casts exactly one ballot, and a player
//! is ejected iff they are the unique leader with strictly more votes than
//! the SKIP count. Positions are preserved across the meeting -- no teleport
//! to the button room, and in-progress task locks resume afterwards.

use std::collections::BTreeMap;

use airlock_agents::legal_actions;
use airlock_types::{Action, DeathCause, Phase, PlayerId, Role, VoteChoice};
use tracing::{info, warn};

use crate::activity::{ActivitySink, make_record};
use crate::decision::{DecisionRequest, DecisionSource, normalize_speech, normalize_vote};
use crate::error::EngineError;
use crate::perception::assemble_perception;
use crate::router::{broadcast_system, deliver_speech};
use crate::state::GameState;
use crate::tick::advance_clock;

/// Speaker priority: accused players defend first, then witnesses, then
/// anyone with something suspicious to share.
fn speaker_priority(state: &GameState, id: PlayerId) -> i32 {
    let Some(player) = state.players.get(&id) else {
        return 0;
    };
    let mut score: i32 = 0;
    if player.is_accused(5) {
        score = score.saturating_add(15);
    }
    if player.has_witnessed_crime() {
        score = score.saturating_add(10);
    } else if player.has_suspicious_observation() {
        score = score.saturating_add(5);
    }
    score
}

/// Run one complete meeting: casualty report, discussion rounds, vote.
pub fn run_meeting(
    state: &mut GameState,
    source: &mut dyn DecisionSource,
    sink: &mut dyn ActivitySink,
) -> Result<(), EngineError> {
    state.phase = Phase::Meeting;
    state.discussion_rounds_left = state.config.discussion_rounds;
    state.rebuild_occupancy();

    broadcast_casualty_report(state);

    let rounds = state.config.discussion_rounds;
    for round in 0..rounds {
        run_discussion_round(state, source, sink, round)?;
    }

    run_voting(state, source, sink)?;
    resolve_votes(state, sink);

    state.phase = Phase::Task;
    state.discussion_rounds_left = state.config.discussion_rounds;
    state.meeting_caller = None;
    state.vote_choices.clear();

    advance_clock(state);
    Ok(())
}

/// Open the meeting with dead-player awareness for every living agent.
///
/// Without this, agents ignore that someone died and the debate devolves
/// into aimless small talk.
fn broadcast_casualty_report(state: &mut GameState) {
    let caller = state
        .meeting_caller
        .and_then(|id| state.players.get(&id))
        .map_or_else(|| String::from("unknown"), |p| p.name.clone());

    let dead: Vec<(String, String)> = state
        .turn_order
        .iter()
        .filter_map(|id| state.players.get(id))
        .filter(|p| !p.alive)
        .map(|p| {
            let body_room = state
                .dead_bodies
                .iter()
                .find(|b| b.player == p.id)
                .map_or_else(
                    || String::from("unknown"),
                    |b| state.map.room_name(b.room).to_owned(),
                );
            (p.name.clone(), body_room)
        })
        .collect();

    if dead.is_empty() {
        let note = format!("[EMERGENCY MEETING] Called by {caller}. No confirmed deaths.");
        broadcast_system(state, &note);
        return;
    }

    let mut lines = vec![
        String::from("=== CASUALTY REPORT ==="),
        format!("Meeting called by: {caller}"),
    ];
    for (name, room) in &dead {
        lines.push(format!("CONFIRMED DEAD: {name} -- body found in {room}"));
    }
    lines.push(String::from(
        "KEY QUESTION: Who was near the body? Who was last seen with the victim? Who has NO alibi?",
    ));
    let report = lines.join("\n");
    broadcast_system(state, &report);
}

/// One discussion round: ordered speakers, broadcast, then condensation.
fn run_discussion_round(
    state: &mut GameState,
    source: &mut dyn DecisionSource,
    sink: &mut dyn ActivitySink,
    round: u32,
) -> Result<(), EngineError> {
    info!(round, "discussion round started");

    let mut order = state.living_players();
    order.sort_by_key(|id| std::cmp::Reverse(speaker_priority(state, *id)));
    if round == 0
        && let Some(caller) = state.meeting_caller
        && state.players.get(&caller).is_some_and(|p| p.alive)
    {
        // The meeting caller opens the first round regardless of priority.
        order.retain(|id| *id != caller);
        order.insert(0, caller);
    }

    let mut speeches: Vec<(String, String)> = Vec::new();
    for id in order {
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        if !player.alive {
            continue;
        }
        let ctx = state.legality_ctx(false);
        let legal = legal_actions(&ctx, player);
        if legal.is_empty() {
            continue;
        }
        let Some(perception) = assemble_perception(state, id, false, legal) else {
            continue;
        };
        let request = DecisionRequest {
            player: id,
            perception,
        };
        let proposed = source.decide(&request).ok();
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        let Action::Speak { message } = normalize_speech(player, proposed) else {
            continue;
        };

        let name = player.name.clone();
        deliver_speech(state, id, round, &message);
        sink.record(&make_record(state, id, format!("SPEAK: \"{message}\"")));
        if let Some(player) = state.players.get_mut(&id) {
            player.action_history.push(airlock_agents::ActionRecord {
                tick: state.timestep,
                phase: format!("meeting phase - round {round}"),
                line: format!("SPEAK: \"{message}\""),
            });
        }
        speeches.push((name, message));
    }

    state.discussion_rounds_left = state.discussion_rounds_left.saturating_sub(1);
    condense_round(state, round, &speeches);
    Ok(())
}

/// Replace the round's individual speech observations with one condensed
/// summary entry per living listener.
fn condense_round(state: &mut GameState, round: u32, speeches: &[(String, String)]) {
    if speeches.is_empty() {
        return;
    }
    let tag = format!("[Discussion Round {round}]");
    let mut lines = vec![format!(
        "=== Round {} Discussion Summary ===",
        round.saturating_add(1)
    )];
    for (name, message) in speeches {
        lines.push(format!("  - {name} said: \"{message}\""));
    }
    let summary = lines.join("\n");
    let tick = state.timestep;
    for player in state.players.values_mut() {
        if player.alive {
            player.memory.condense_round(&tag, tick, summary.clone());
        }
    }
}

/// The voting sub-phase: exactly one ballot per living player.
fn run_voting(
    state: &mut GameState,
    source: &mut dyn DecisionSource,
    sink: &mut dyn ActivitySink,
) -> Result<(), EngineError> {
    info!("voting phase");
    state.vote_choices.clear();

    for id in state.living_players() {
        if state.vote_choices.contains_key(&id) {
            warn!(voter = %id, "duplicate ballot suppressed");
            continue;
        }
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        let ctx = state.legality_ctx(true);
        let legal = legal_actions(&ctx, player);
        let proposed = assemble_perception(state, id, true, legal.clone())
            .map(|perception| DecisionRequest {
                player: id,
                perception,
            })
            .and_then(|request| source.decide(&request).ok());
        let Some(player) = state.players.get(&id) else {
            continue;
        };
        let choice = normalize_vote(player, &legal, proposed);
        state.vote_choices.insert(id, choice);

        let line = match choice {
            VoteChoice::Player(target) => {
                let target_name = state
                    .players
                    .get(&target)
                    .map_or_else(String::new, |p| p.name.clone());
                format!("VOTE {target_name}")
            }
            VoteChoice::Skip => String::from("VOTE SKIP"),
        };
        sink.record(&make_record(state, id, line));
    }
    Ok(())
}

/// Tally the ballots and apply the ejection rule.
///
/// A player is ejected iff they are the *unique* top vote-getter and their
/// count strictly exceeds the SKIP count. Ties and SKIP-leading outcomes
/// eject no one.
fn resolve_votes(state: &mut GameState, sink: &mut dyn ActivitySink) {
    let tick = state.timestep;
    let mut counts: BTreeMap<PlayerId, u32> = BTreeMap::new();
    let mut skips = 0_u32;
    for choice in state.vote_choices.values() {
        match choice {
            VoteChoice::Player(target) => {
                let entry = counts.entry(*target).or_insert(0);
                *entry = entry.saturating_add(1);
            }
            VoteChoice::Skip => skips = skips.saturating_add(1),
        }
    }

    let ballot_lines: Vec<String> = state
        .vote_choices
        .iter()
        .map(|(voter, choice)| {
            let voter_name = state
                .players
                .get(voter)
                .map_or_else(String::new, |p| p.name.clone());
            let target_name = match choice {
                VoteChoice::Player(target) => state
                    .players
                    .get(target)
                    .map_or_else(String::new, |p| p.name.clone()),
                VoteChoice::Skip => String::from("SKIP"),
            };
            format!("{voter_name} voted for {target_name}")
        })
        .collect();

    let max_votes = counts.values().copied().max().unwrap_or(0);
    let leaders: Vec<PlayerId> = counts
        .iter()
        .filter(|(_, votes)| **votes == max_votes)
        .map(|(id, _)| *id)
        .collect();

    let result_text = if counts.is_empty() {
        String::from("No votes were cast. No one was ejected.")
    } else if let [leader] = leaders.as_slice()
        && max_votes > skips
    {
        let name = state
            .players
            .get(leader)
            .map_or_else(String::new, |p| p.name.clone());
        if let Some(player) = state.players.get_mut(leader)
            && let Err(err) = player.mark_dead(tick, DeathCause::Ejected)
        {
            warn!(%err, "ejection transition failed");
        }
        let remaining = state.living_count(Role::Impostor);
        let was = state
            .players
            .get(leader)
            .is_some_and(|p| p.role == Role::Impostor);
        info!(ejected = %name, impostor = was, "player ejected");
        format!(
            "{name} was ejected ({max_votes} votes). {name} was {}an Impostor. ({remaining} Impostor{} remain)",
            if was { "" } else { "NOT " },
            if remaining == 1 { "" } else { "s" },
        )
    } else if leaders.len() > 1 {
        let names: Vec<String> = leaders
            .iter()
            .filter_map(|id| state.players.get(id))
            .map(|p| p.name.clone())
            .collect();
        format!(
            "Tie vote ({} each got {max_votes} votes). No one was ejected.",
            names.join(", ")
        )
    } else {
        format!("No one was ejected. SKIP won with {skips} votes.")
    };

    let broadcast = format!(
        "[VOTE RESULT] {result_text} Ballots: {}",
        ballot_lines.join("; ")
    );
    broadcast_system(state, &broadcast);
    sink.record(&make_record(
        state,
        state.meeting_caller.unwrap_or(PlayerId(0)),
        format!("VOTE RESULT: {result_text}"),
    ));
}
