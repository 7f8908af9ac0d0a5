//! The speaking score: a post-generation hallucination firewall for meeting
//! speech.
//!
//! Before an utterance enters the game, it is scored against the speaker's
//! "valid truths" -- the rooms they actually visited and the players they
//! actually saw, straight from the engine-recorded presence log. Positive
//! points reward grounded evidence (witnessed kills, verifiable alibis,
//! spatial contradictions); heavy negative points catch the hallucination
//! classes: X-ray vision (claims about unvisited rooms), meta-gaming
//! (referencing engine machinery), self-incrimination, and spatial
//! non-sequiturs. A negative total rejects the speech for regeneration.
//!
//! The pattern bank is compiled once per game from the ship's room names.

use std::collections::{BTreeMap, BTreeSet};

use airlock_types::{ObservationKind, Perception, Role};
use regex::Regex;

use crate::parse::compile;

/// What the speaker actually knows, precomputed from ground truth.
#[derive(Debug, Clone, Default)]
pub struct ValidTruths {
    /// Rooms the speaker physically visited (lowercase).
    pub rooms_visited: BTreeSet<String>,
    /// Players seen per room (lowercase room -> lowercase names).
    pub players_seen: BTreeMap<String, BTreeSet<String>>,
    /// Whether the speaker witnessed a kill.
    pub saw_kill: bool,
    /// Whether the speaker witnessed a vent.
    pub saw_vent: bool,
    /// Whether the speaker is the impostor.
    pub is_impostor: bool,
    /// The impostor's real kill room (lowercase), if any.
    pub kill_room: Option<String>,
    /// The impostor's public alibi room (lowercase), if any.
    pub public_alibi: Option<String>,
}

/// Build the truth table for a speaker from their perception payload.
pub fn compute_valid_truths(perception: &Perception) -> ValidTruths {
    let mut truths = ValidTruths {
        is_impostor: perception.self_state.role == Role::Impostor,
        ..ValidTruths::default()
    };

    for entry in &perception.presence_log {
        let room = entry.room.to_lowercase();
        truths.rooms_visited.insert(room.clone());
        let seen = truths.players_seen.entry(room).or_default();
        for name in &entry.players_seen {
            seen.insert(name.to_lowercase());
        }
    }
    // The current room always counts as visited.
    truths
        .rooms_visited
        .insert(perception.self_state.room.to_lowercase());

    for entry in &perception.memory.verified {
        if entry.kind != ObservationKind::VisualCrime {
            continue;
        }
        let upper = entry.event.to_uppercase();
        if upper.contains("KILL") {
            truths.saw_kill = true;
        }
        if upper.contains("VENT") {
            truths.saw_vent = true;
        }
    }

    if let Some(ledger) = &perception.deception {
        truths.kill_room = ledger.kill_room.as_ref().map(|r| r.to_lowercase());
        truths.public_alibi = ledger.public_alibi.as_ref().map(|r| r.to_lowercase());
        // Intentional deception is allowed: the alibi room scores as
        // visited so the cover story passes the X-ray filter.
        if let Some(alibi) = &truths.public_alibi {
            truths.rooms_visited.insert(alibi.clone());
        }
    }

    truths
}

/// One scored condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreItem {
    /// Condition label, e.g. `X-RAY VISION`.
    pub label: &'static str,
    /// Points awarded (negative = rejection trigger).
    pub points: i32,
    /// Human-readable detail for the log.
    pub detail: String,
}

/// The compiled scoring bank for one ship.
pub struct SpeechScorer {
    first_person_location: Regex,
    observation_claims: Vec<Regex>,
    presence_denial: Regex,
    spatial_non_sequitur: Regex,
    hard_alibi: Regex,
    sighting: Regex,
    meta_patterns: Vec<Regex>,
    incrimination: Vec<Regex>,
}

impl SpeechScorer {
    /// Compile the bank from the ship's room names.
    pub fn new(room_names: &[String]) -> Self {
        // Longest-first alternation so "Lower Engine" wins over "Engine".
        let mut sorted: Vec<String> = room_names.iter().map(|r| regex::escape(&r.to_lowercase())).collect();
        sorted.sort_by_key(|r| std::cmp::Reverse(r.len()));
        let rooms = format!("(?:{})", sorted.join("|"));
        let subject = r"(?:player\s*\d+[\w\s:]*?|you|they|he|she)";

        Self {
            first_person_location: compile(&format!(r"\bi was (?:in|at) ({rooms})")),
            observation_claims: vec![
                compile(&format!(
                    r"\bi (?:saw|noticed|watched|witnessed) .+? (?:in|at) ({rooms})"
                )),
                compile(&format!(r"\bwhen i was (?:in|at) ({rooms})")),
                compile(&format!(r"\bin ({rooms}),?\s+i (?:saw|noticed|watched|witnessed)")),
            ],
            presence_denial: compile(&format!(
                r"{subject}\s+(?:was not|wasn't|were not|weren't|couldn'?t have been|could not have been)\s+(?:in|at)\s+({rooms})"
            )),
            spatial_non_sequitur: compile(&format!(
                r"i was (?:in|at) ({rooms}).*?(?:so|therefore|thus|which means|that means|this means).*?{subject}\s+(?:weren't|wasn't|couldn'?t|could not|were not|was not|can'?t|cannot)\s+(?:have been\s+)?(?:in|at)\s+({rooms})"
            )),
            hard_alibi: compile(&format!(r"\bi was with ([\w\s:]+?) (?:in|at) ({rooms})")),
            sighting: compile(r"\bi saw [\w\s:]+ (?:in|at|near|heading|going)"),
            meta_patterns: vec![
                compile(r"(?i)\bverified presence log\b"),
                compile(r"(?i)\bgame engine\b"),
                compile(r"(?i)\bsystem log\b"),
                compile(r"(?i)\bmemory stream\b"),
                compile(r"(?i)\btimestep\s*\d+\b"),
                compile(r"\bT\d+\b"),
                compile(r"(?i)\bobservation history\b"),
                compile(r"(?i)\baction history\b"),
                compile(r"(?i)\bpresence log\b"),
            ],
            incrimination: vec![
                compile(r"(?i)\bi killed\b"),
                compile(r"(?i)\bi did kill\b"),
                compile(r"(?i)\bi murdered\b"),
                compile(r"(?i)\bi vented\b"),
                compile(r"(?i)\bi used (?:the )?vent\b"),
            ],
        }
    }

    /// Score one speech candidate. Negative totals must be rejected.
    #[allow(clippy::too_many_lines)]
    pub fn score(&self, speech: &str, truths: &ValidTruths) -> (i32, Vec<ScoreItem>) {
        let mut score = 0_i32;
        let mut breakdown: Vec<ScoreItem> = Vec::new();
        let normalized = speech.split_whitespace().collect::<Vec<_>>().join(" ");
        let lower = normalized.to_lowercase();

        // --- D. Hallucination filters (rejection triggers) ---

        // D1. Meta-gaming: referencing engine machinery in natural speech.
        for pattern in &self.meta_patterns {
            if let Some(found) = pattern.find(&normalized) {
                score = score.saturating_sub(50);
                breakdown.push(ScoreItem {
                    label: "META-GAMING",
                    points: -50,
                    detail: format!("referenced game mechanic: '{}'", found.as_str()),
                });
                break;
            }
        }

        // D2. Self-incrimination: an impostor confessing or naming the real
        // kill room as their own location.
        if truths.is_impostor && truths.kill_room.is_some() {
            for pattern in &self.incrimination {
                if pattern.is_match(&normalized) {
                    score = score.saturating_sub(50);
                    breakdown.push(ScoreItem {
                        label: "SELF-INCRIMINATION",
                        points: -50,
                        detail: String::from("confession detected"),
                    });
                    break;
                }
            }
            if let (Some(kill_room), Some(alibi)) = (&truths.kill_room, &truths.public_alibi)
                && kill_room != alibi
                && lower.contains(&format!("i was in {kill_room}"))
            {
                score = score.saturating_sub(50);
                breakdown.push(ScoreItem {
                    label: "SELF-INCRIMINATION",
                    points: -50,
                    detail: format!("revealed kill location: {kill_room}"),
                });
            }
        }

        // D3. Spatial non-sequitur: being in room A proves nothing about
        // room B.
        if let Some(caps) = self.spatial_non_sequitur.captures(&lower) {
            let room_a = caps.get(1).map_or("", |m| m.as_str());
            let room_b = caps.get(2).map_or("", |m| m.as_str());
            if room_a != room_b {
                score = score.saturating_sub(20);
                breakdown.push(ScoreItem {
                    label: "SPATIAL NON-SEQUITUR",
                    points: -20,
                    detail: format!("in '{room_a}' -> claimed knowledge of '{room_b}'"),
                });
            }
        }

        // D4. X-ray vision: claims about rooms outside the LOS table.
        // Crewmates: first-person location claims are checked; impostors may
        // claim the alibi room (already injected into rooms_visited).
        let mut xray = false;
        if !truths.is_impostor {
            for caps in self.first_person_location.captures_iter(&lower) {
                let room = caps.get(1).map_or("", |m| m.as_str());
                if !truths.rooms_visited.contains(room) {
                    score = score.saturating_sub(100);
                    breakdown.push(ScoreItem {
                        label: "X-RAY VISION",
                        points: -100,
                        detail: format!("claimed to be in '{room}' (never visited)"),
                    });
                    xray = true;
                    break;
                }
            }
        }
        if !xray {
            'outer: for pattern in &self.observation_claims {
                for caps in pattern.captures_iter(&lower) {
                    let room = caps.get(1).map_or("", |m| m.as_str());
                    if !truths.rooms_visited.contains(room) {
                        score = score.saturating_sub(100);
                        breakdown.push(ScoreItem {
                            label: "X-RAY VISION",
                            points: -100,
                            detail: format!("claimed observation in '{room}' (never visited)"),
                        });
                        xray = true;
                        break 'outer;
                    }
                }
            }
        }
        if !xray {
            // Denying someone's presence in a room requires having been there.
            for caps in self.presence_denial.captures_iter(&lower) {
                let room = caps.get(1).map_or("", |m| m.as_str());
                if !truths.rooms_visited.contains(room) {
                    score = score.saturating_sub(100);
                    breakdown.push(ScoreItem {
                        label: "X-RAY VISION",
                        points: -100,
                        detail: format!("denied player presence in '{room}' (never visited)"),
                    });
                    break;
                }
            }
        }

        // --- A. Hard evidence ---

        if truths.saw_kill
            && ["kill", "murder", "stab", "attack"].iter().any(|kw| lower.contains(kw))
        {
            score = score.saturating_add(20);
            breakdown.push(ScoreItem {
                label: "KILL WITNESS",
                points: 20,
                detail: String::from("referenced witnessed kill"),
            });
        }

        if truths.saw_vent && lower.contains("vent") {
            score = score.saturating_add(18);
            breakdown.push(ScoreItem {
                label: "VENT WITNESS",
                points: 18,
                detail: String::from("referenced witnessed vent"),
            });
        }

        if let Some(caps) = self.hard_alibi.captures(&lower) {
            let claimed_player = caps.get(1).map_or("", |m| m.as_str()).trim();
            let claimed_room = caps.get(2).map_or("", |m| m.as_str());
            if truths.rooms_visited.contains(claimed_room)
                && truths
                    .players_seen
                    .get(claimed_room)
                    .is_some_and(|seen| seen.iter().any(|p| p.contains(claimed_player)))
            {
                score = score.saturating_add(12);
                breakdown.push(ScoreItem {
                    label: "HARD ALIBI",
                    points: 12,
                    detail: format!("verified: with '{claimed_player}' in '{claimed_room}'"),
                });
            }
        }

        let contradiction_kws = [
            "how did you get from",
            "rooms aren't connected",
            "rooms aren't adjacent",
            "not adjacent",
            "that's impossible",
            "did you vent",
        ];
        let path_contradiction = contradiction_kws.iter().any(|kw| lower.contains(kw));
        if path_contradiction {
            score = score.saturating_add(10);
            breakdown.push(ScoreItem {
                label: "PATH CONTRADICTION",
                points: 10,
                detail: String::from("questioned impossible travel"),
            });
        }

        // --- B. Soft evidence ---

        let task_kws = [
            "task bar didn't",
            "task bar did not",
            "faking task",
            "fake task",
            "bar didn't go up",
            "bar didn't move",
        ];
        if task_kws.iter().any(|kw| lower.contains(kw)) {
            score = score.saturating_add(8);
            breakdown.push(ScoreItem {
                label: "TASK LOGIC",
                points: 8,
                detail: String::from("referenced task bar evidence"),
            });
        }

        let spatial_kws = ["couldn't get from", "can't get from", "too far", "not enough time"];
        if !path_contradiction && spatial_kws.iter().any(|kw| lower.contains(kw)) {
            score = score.saturating_add(8);
            breakdown.push(ScoreItem {
                label: "SPATIAL LOGIC",
                points: 8,
                detail: String::from("referenced spatial impossibility"),
            });
        }

        let defense_kws = ["watch me do", "visual task", "watch me complete", "i can prove"];
        if defense_kws.iter().any(|kw| lower.contains(kw)) {
            score = score.saturating_add(10);
            breakdown.push(ScoreItem {
                label: "DIRECT DEFENSE",
                points: 10,
                detail: String::from("offered visual proof"),
            });
        }

        if !truths.saw_kill && !truths.saw_vent && self.sighting.is_match(&lower) {
            score = score.saturating_add(5);
            breakdown.push(ScoreItem {
                label: "SIGHTING",
                points: 5,
                detail: String::from("reported seeing a player"),
            });
        }

        // --- C. Noise and fluff ---
        let has_substance = breakdown.iter().any(|item| item.points > 0);
        if !has_substance {
            if lower.contains("skip") || lower.contains("don't have enough") {
                score = score.saturating_add(1);
                breakdown.push(ScoreItem {
                    label: "SKIP VOTE",
                    points: 1,
                    detail: String::from("suggested skipping"),
                });
            } else if lower.contains("i agree") || lower.contains("i think so too") {
                score = score.saturating_add(1);
                breakdown.push(ScoreItem {
                    label: "AGREEMENT",
                    points: 1,
                    detail: String::from("agreed with another player"),
                });
            } else if ["didn't see", "don't know", "no information", "no evidence", "nothing suspicious"]
                .iter()
                .any(|kw| lower.contains(kw))
            {
                score = score.saturating_add(2);
                breakdown.push(ScoreItem {
                    label: "UNCERTAINTY",
                    points: 2,
                    detail: String::from("expressed lack of information"),
                });
            } else {
                score = score.saturating_add(2);
                breakdown.push(ScoreItem {
                    label: "GENERAL",
                    points: 2,
                    detail: String::from("unclassified speech"),
                });
            }
        }

        (score, breakdown)
    }
}

/// Build the correction appended to a regeneration prompt, naming the
/// violation classes.
pub fn correction_text(breakdown: &[ScoreItem]) -> String {
    let mut corrections = Vec::new();
    let labels: BTreeSet<&str> = breakdown
        .iter()
        .filter(|item| item.points < 0)
        .map(|item| item.label)
        .collect();
    if labels.contains("X-RAY VISION") {
        corrections.push(
            "You can ONLY discuss rooms you PERSONALLY visited and players you PERSONALLY saw. If you were not in a room, you cannot claim to know who was or wasn't there.",
        );
    }
    if labels.contains("META-GAMING") {
        corrections.push(
            "Speak naturally like a real person. Do NOT reference 'logs', 'timesteps', 'T0', 'T1', or any game mechanics.",
        );
    }
    if labels.contains("SELF-INCRIMINATION") {
        corrections.push(
            "Protect your cover. Talk about your tasks and what you observed. Do NOT reveal anything about your actual actions.",
        );
    }
    if labels.contains("SPATIAL NON-SEQUITUR") {
        corrections.push(
            "Being in one room tells you NOTHING about a different room. Only make claims about rooms you were physically in.",
        );
    }
    if corrections.is_empty() {
        corrections.push("Stick to what you actually saw in your current room.");
    }
    corrections.join(" ")
}

/// The safe fallback utterance substituted when all attempts score negative.
pub fn safe_fallback(is_impostor: bool) -> String {
    if is_impostor {
        String::from(
            "I was doing my tasks. I didn't see anything unusual. Has anyone else found anything?",
        )
    } else {
        String::from("I was doing my tasks. I don't have direct evidence to share right now.")
    }
}

#[cfg(test)]
mod tests {
    use airlock_types::{DeceptionLedger, PresenceEntry, VerifiedObservation};

    use crate::testutil::minimal_perception;

    use super::*;

    fn scorer() -> SpeechScorer {
        let rooms: Vec<String> = [
            "Cafeteria", "Weapons", "Navigation", "O2", "Shields", "Communications", "Storage",
            "Admin", "Electrical", "Lower Engine", "Security", "Reactor", "Upper Engine", "Medbay",
        ]
        .iter()
        .map(|r| (*r).to_owned())
        .collect();
        SpeechScorer::new(&rooms)
    }

    fn crewmate_truths() -> ValidTruths {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.presence_log.push(PresenceEntry {
            tick: 2,
            room: String::from("Electrical"),
            players_seen: vec![String::from("Player 3: green")],
        });
        perception.presence_log.push(PresenceEntry {
            tick: 3,
            room: String::from("Storage"),
            players_seen: Vec::new(),
        });
        compute_valid_truths(&perception)
    }

    #[test]
    fn xray_vision_rejects_unvisited_room_claims() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (score, breakdown) =
            scorer.score("I was in Medbay and everything was fine there.", &truths);
        assert!(score < 0);
        assert!(breakdown.iter().any(|i| i.label == "X-RAY VISION"));
    }

    #[test]
    fn xray_vision_rejects_denials_about_unvisited_rooms() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (score, breakdown) = scorer.score(
            "Player 2: blue wasn't in Reactor, I'm sure of it.",
            &truths,
        );
        assert!(score < 0);
        assert!(breakdown.iter().any(|i| i.detail.contains("reactor")));
    }

    #[test]
    fn visited_room_claims_pass() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (score, _) = scorer.score("I was in Electrical doing my wiring task.", &truths);
        assert!(score >= 0);
    }

    #[test]
    fn meta_gaming_rejected() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (score, breakdown) = scorer.score(
            "According to my memory stream I was in Electrical at T3.",
            &truths,
        );
        assert!(score < 0);
        assert!(breakdown.iter().any(|i| i.label == "META-GAMING"));
    }

    #[test]
    fn impostor_confession_rejected_but_alibi_allowed() {
        let scorer = scorer();
        let mut perception = minimal_perception(Role::Impostor);
        perception.deception = Some(DeceptionLedger {
            kill_room: Some(String::from("Electrical")),
            victim: Some(String::from("Player 2: blue")),
            public_alibi: Some(String::from("Storage")),
            fake_memory: Vec::new(),
        });
        let truths = compute_valid_truths(&perception);

        let (score, breakdown) = scorer.score("Fine -- I killed him in Electrical.", &truths);
        assert!(score < 0);
        assert!(breakdown.iter().any(|i| i.label == "SELF-INCRIMINATION"));

        // The lie that matches the prepared alibi sails through.
        let (score, _) = scorer.score("I was in Storage doing my tasks the whole time.", &truths);
        assert!(score >= 0);

        // Naming the real kill room as one's own location is incrimination.
        let (score, breakdown) =
            scorer.score("I was in Electrical doing my tasks.", &truths);
        assert!(score < 0);
        assert!(breakdown.iter().any(|i| i.detail.contains("kill location")));
    }

    #[test]
    fn spatial_non_sequitur_penalized() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (_, breakdown) = scorer.score(
            "I was in Storage, so you couldn't have been in Electrical.",
            &truths,
        );
        assert!(breakdown.iter().any(|i| i.label == "SPATIAL NON-SEQUITUR"));
    }

    #[test]
    fn kill_witness_scores_high() {
        let scorer = scorer();
        let mut perception = minimal_perception(Role::Crewmate);
        perception.presence_log.push(PresenceEntry {
            tick: 2,
            room: String::from("Electrical"),
            players_seen: vec![String::from("Player 2: blue")],
        });
        perception.memory.verified.push(VerifiedObservation {
            tick: 2,
            event: String::from("[CONFIRMED EYEWITNESS] Player 2: blue KILL Player 4: pink"),
            kind: ObservationKind::VisualCrime,
            location: String::from("Electrical"),
        });
        let truths = compute_valid_truths(&perception);
        let (score, breakdown) = scorer.score(
            "I watched Player 2: blue kill Player 4 right in front of me in Electrical!",
            &truths,
        );
        assert!(score >= 20);
        assert!(breakdown.iter().any(|i| i.label == "KILL WITNESS"));
    }

    #[test]
    fn hard_alibi_verified_by_los_table() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (score, breakdown) = scorer.score(
            "I was with Player 3: green in Electrical for two turns.",
            &truths,
        );
        assert!(score >= 12);
        assert!(breakdown.iter().any(|i| i.label == "HARD ALIBI"));
    }

    #[test]
    fn fluff_scores_small_positive() {
        let scorer = scorer();
        let truths = crewmate_truths();
        let (score, breakdown) = scorer.score("I don't know, nothing suspicious on my side.", &truths);
        assert!(score > 0 && score <= 2);
        assert!(breakdown.iter().any(|i| i.label == "UNCERTAINTY"));
    }

    #[test]
    fn correction_text_names_violation_classes() {
        let breakdown = vec![
            ScoreItem {
                label: "X-RAY VISION",
                points: -100,
                detail: String::new(),
            },
            ScoreItem {
                label: "META-GAMING",
                points: -50,
                detail: String::new(),
            },
        ];
        let text = correction_text(&breakdown);
        assert!(text.contains("PERSONALLY visited"));
        assert!(text.contains("game mechanics"));
    }

    #[test]
    fn safe_fallback_differs_by_role() {
        assert!(safe_fallback(true).contains("anyone else"));
        assert!(safe_fallback(false).contains("direct evidence"));
    }
}
