//! LLM response parsing: normalization, tiered action resolution, and the
//! smart fallback.
//!
//! Raw model output is adversarial, stochastic, and frequently malformed.
//! The pipeline applies, in order:
//!
//! 1. **Normalization** -- relocate `[SPEAK: ...]`-style headers into proper
//!    `[Action]` lines, promote bare trailing action lines, and (when the
//!    response was truncated before the action tag) recover the intent from
//!    the reasoning text.
//! 2. **Resolution** against the legal-action list in five attempts: exact
//!    repr match, structured `[Action] TYPE payload` match, meeting-trigger
//!    keyword match, substring containment, and a SPEAK-quote fallback.
//! 3. **Smart fallback** -- scan for a destination room or a target name and
//!    salvage the closest matching legal action; voting defaults to SKIP
//!    rather than a random ballot.
//! 4. **Thought-action alignment** -- reasoning that says "stay" while the
//!    resolved action is MOVE overrides to task work.
//!
//! Failure everywhere returns `None`; the decision layer then falls back to
//! the first legal action (skipping is forbidden outside voting).

use std::sync::LazyLock;

use airlock_types::{Action, ActionKind, Perception, VoteChoice};
use regex::Regex;
use tracing::debug;

/// Compile a hard-coded pattern.
pub(crate) fn compile(pattern: &str) -> Regex {
    #[allow(clippy::expect_used)]
    let regex = Regex::new(pattern).expect("hard-coded pattern compiles");
    regex
}

/// Action-line prefixes recognized during normalization.
const ACTION_PREFIXES: [&str; 11] = [
    "SPEAK", "VOTE", "MOVE", "KILL", "COMPLETE", "CALL", "REPORT", "VENT", "SABOTAGE", "FIX",
    "VIEW",
];

static COT_SPEAK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^(\s*)SPEAK\s*:"));

static ACTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"\[Action\]:?\s*([A-Z]+(?:\s+[A-Z]+)*)\b[-:\s]*(.*)"#)
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| compile(r#""([^"]*)""#));

static THOUGHT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?is)THOUGHT\s*:\s*(.*?)(?:\nSPEAK\s*:|\n\[Action\]|\z)"#));

static SPEECH_FORMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r#"(?is)(?:^|\n)\s*(?:\[Action\]\s*)?SPEAK\s*:?\s*"(.*?)""#),
        compile(r#"(?is)(?:^|\n)\s*(?:\[Action\]\s*)?SPEAK\s*:?\s*'(.*?)'"#),
        compile(r#"(?im)(?:^|\n)\s*(?:\[Action\]\s*)?SPEAK\s*:?\s*(.+)$"#),
    ]
});

/// Intent patterns used for truncation recovery: "I should MOVE to X" style
/// phrases in the reasoning text when the `[Action]` tag never arrived.
static INTENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"(?i)I (?:SHOULD|WILL|MUST|NEED TO|AM GOING TO)\s+(MOVE\s+(?:FROM\s+[\w ]+?\s+)?TO\s+[\w ]+?)(?:[.,\n]|$)"),
        compile(r"(?i)I (?:SHOULD|WILL|MUST|NEED TO)\s+(COMPLETE\s+(?:FAKE\s+)?TASK(?:\s*-\s*[\w ]+)?)"),
        compile(r"(?i)I (?:SHOULD|WILL|MUST|NEED TO)\s+(KILL\s+PLAYER\s+\d+[:\s]*\w+)"),
        compile(r"(?i)I (?:SHOULD|WILL|MUST|NEED TO)\s+((?:REPORT\s+DEAD\s+BODY|CALL\s+MEETING)[\w ]*)"),
        compile(r"(?i)I (?:SHOULD|WILL|MUST|NEED TO)\s+VOTE\s+(?:FOR\s+)?(PLAYER\s+\d+[:\s]*\w+)"),
        compile(r"(?i)I (?:SHOULD|WILL|MUST|NEED TO)\s+(VOTE\s+SKIP)"),
    ]
});

static STAY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"(?i)\bmust\s+stay\b"),
        compile(r"(?i)\bshould\s+stay\b"),
        compile(r"(?i)\bneed\s+to\s+stay\b"),
        compile(r"(?i)\bstay\s+(?:in|here|and|to)\b"),
        compile(r"(?i)\bremain\s+(?:in|here)\b"),
        compile(r"(?i)\bfinish\s+(?:my|the|this)\s+task\b"),
        compile(r"(?i)\bcomplete\s+(?:my|the|this)\s+task\b"),
        compile(r"(?i)\bdon'?t\s+move\b"),
        compile(r"(?i)\bshould\s*n[o']t\s+move\b"),
    ]
});

/// Normalize raw output so it always carries a proper `[Action]` section.
pub fn normalize_response(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut text = raw.to_owned();

    // Chain-of-Thought discussion format: wrap the first bare `SPEAK:` so
    // the downstream [Action] parsers can see it.
    if !text.contains("[Action]") && COT_SPEAK.is_match(&text) {
        text = COT_SPEAK.replace(&text, "${1}[Action] SPEAK:").into_owned();
    }

    if text.contains("[Action]") {
        return text;
    }

    // Pattern 1: bracket-header misuse, e.g. `[SPEAK: "..."]` or `[VOTE X]`.
    let mut lines: Vec<String> = text.lines().map(ToOwned::to_owned).collect();
    let mut rewritten = false;
    for line in &mut lines {
        let trimmed = line.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
            let inner = trimmed
                .get(1..trimmed.len().saturating_sub(1))
                .unwrap_or_default();
            let upper = inner.to_uppercase();
            if ACTION_PREFIXES.iter().any(|p| upper.starts_with(p)) {
                *line = format!("[Action] {inner}");
                rewritten = true;
            }
        }
    }
    if rewritten {
        return lines.join("\n");
    }

    // Pattern 2: bare action line, scanned from the end (multi-line SPEAK
    // messages mean the action line is not necessarily last).
    for line in lines.iter_mut().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let upper = trimmed.to_uppercase();
        if ACTION_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            *line = format!("[Action] {trimmed}");
            return lines.join("\n");
        }
    }

    // Pattern 3: truncation recovery. The response was cut off before the
    // action tag; pull the intent out of the reasoning text.
    for pattern in INTENT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&text)
            && let Some(intent) = caps.get(1)
        {
            let mut extracted = intent.as_str().trim().trim_end_matches('.').to_owned();
            if pattern.as_str().contains("VOTE") && !extracted.to_uppercase().starts_with("VOTE") {
                extracted = format!("VOTE {extracted}");
            }
            debug!(%extracted, "truncation recovery: action intent pulled from reasoning");
            text.push_str(&format!("\n[Action] {extracted}"));
            return text;
        }
    }

    text
}

/// Extract the private THOUGHT block from a CoT-formatted response.
pub fn extract_thought(raw: &str) -> Option<String> {
    THOUGHT
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Extract the public SPEAK message from a response, in any supported form.
pub fn extract_speech(raw: &str) -> Option<String> {
    for pattern in SPEECH_FORMS.iter() {
        if let Some(caps) = pattern.captures(raw)
            && let Some(message) = caps.get(1)
        {
            let text = message.as_str().trim().trim_matches('"').trim_matches('\'').trim();
            if !text.is_empty() {
                return Some(text.to_owned());
            }
        }
    }
    None
}

/// A successfully resolved action.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Index into the perception's legal-action list.
    pub index: usize,
    /// The concrete action, with SPEAK messages substituted in.
    pub action: Action,
    /// The repr that matched, for logging.
    pub repr: String,
}

/// Destination room parsed out of a MOVE/VENT repr.
fn repr_destination(repr: &str) -> Option<&str> {
    repr.split(" to ").nth(1).map(str::trim)
}

/// Target name parsed out of a KILL/VOTE repr.
fn repr_target(repr: &str) -> Option<&str> {
    repr.split_once(' ').map(|(_, rest)| rest.trim())
}

/// Resolve normalized output against the legal actions.
///
/// Returns `None` only when every tier fails; the caller then applies the
/// engine's first-legal fallback.
pub fn resolve_action(output: &str, perception: &Perception) -> Option<Resolved> {
    let legal = &perception.legal_actions;
    if legal.is_empty() {
        return None;
    }
    let trimmed = output.trim();
    let upper = trimmed.to_uppercase();

    // Tier (a): exact repr match.
    if let Some(index) = legal.iter().position(|la| la.repr == trimmed) {
        return finish(perception, index, output);
    }

    // Tier (b): structured [Action] TYPE payload match.
    if let Some(caps) = ACTION_TAG.captures(trimmed) {
        let kind_text = caps.get(1).map_or("", |m| m.as_str().trim());
        let payload = caps.get(2).map_or("", |m| m.as_str().trim());
        if let Some(resolved) = match_structured(perception, kind_text, payload, output) {
            return Some(resolved);
        }
    }

    // Tier (c): flexible meeting-trigger keyword match.
    if upper.contains("CALL MEETING") || upper.contains("REPORT DEAD BODY") {
        if let Some(index) = legal
            .iter()
            .position(|la| la.action.kind().triggers_meeting())
        {
            return finish(perception, index, output);
        }
    }

    // Tier (d): substring containment.
    if let Some(index) = legal.iter().position(|la| trimmed.contains(la.repr.as_str())) {
        return finish(perception, index, output);
    }

    // Tier (e): SPEAK-quote fallback.
    if legal.iter().any(|la| la.action.kind() == ActionKind::Speak)
        && (trimmed.contains('"') || upper.contains("SPEAK"))
    {
        if let Some(index) = legal.iter().position(|la| la.action.kind() == ActionKind::Speak) {
            return finish(perception, index, output);
        }
    }

    smart_fallback(perception, &upper, output)
}

/// Tier (b): match an extracted TYPE + payload against the legal set.
fn match_structured(
    perception: &Perception,
    kind_text: &str,
    payload: &str,
    output: &str,
) -> Option<Resolved> {
    let legal = &perception.legal_actions;
    let payload_upper = payload.to_uppercase();

    let kind_matches = |kind: ActionKind| -> bool {
        let name = kind.name();
        kind_text == name
            // The two meeting triggers are aliases in model output.
            || (kind.triggers_meeting()
                && (kind_text == "CALL MEETING" || kind_text == "REPORT DEAD BODY"))
    };

    let mut first_kind_match = None;
    for (index, la) in legal.iter().enumerate() {
        let kind = la.action.kind();
        if !kind_matches(kind) {
            continue;
        }
        if first_kind_match.is_none() {
            first_kind_match = Some(index);
        }
        let payload_hits = match &la.action {
            Action::Move { .. } | Action::Vent { .. } => repr_destination(&la.repr)
                .is_some_and(|dest| payload_upper.contains(&dest.to_uppercase())),
            Action::Kill { .. } | Action::Vote { choice: VoteChoice::Player(_) } => {
                repr_target(&la.repr)
                    .is_some_and(|target| payload_upper.contains(&target.to_uppercase()))
            }
            Action::Vote { choice: VoteChoice::Skip } => payload_upper.contains("SKIP"),
            Action::CompleteTask { .. } | Action::CompleteFakeTask { .. } => la
                .repr
                .split_once(" - ")
                .is_some_and(|(_, name)| {
                    let name = name.split(" (").next().unwrap_or(name);
                    payload_upper.contains(&name.to_uppercase())
                }),
            Action::Sabotage { kind } | Action::FixSabotage { kind } => {
                payload_upper.contains(&kind.to_string())
            }
            Action::ViewMonitor { .. } => la
                .repr
                .split_once(" - ")
                .is_some_and(|(_, room)| payload_upper.contains(&room.to_uppercase())),
            Action::Speak { .. } | Action::CallMeeting | Action::ReportBody => true,
        };
        if payload_hits {
            return finish(perception, index, output);
        }
    }

    // Kind matched but no payload did: targeted actions with an empty
    // payload fall back to the only instance; ambiguous payloads keep
    // looking in later tiers.
    if payload.is_empty() {
        if let Some(index) = first_kind_match {
            return finish(perception, index, output);
        }
    }
    None
}

/// The smart fallback: salvage intent when no tier matched.
fn smart_fallback(perception: &Perception, upper: &str, output: &str) -> Option<Resolved> {
    let legal = &perception.legal_actions;

    // Destination-room scan over MOVE/VENT instances.
    if upper.contains("MOVE") || upper.contains("VENT") {
        for (index, la) in legal.iter().enumerate() {
            if la.action.kind().is_movement()
                && repr_destination(&la.repr)
                    .is_some_and(|dest| upper.contains(&dest.to_uppercase()))
            {
                debug!(repr = %la.repr, "smart fallback: matched movement destination");
                return finish(perception, index, output);
            }
        }
    }

    // KILL with a hallucinated target: redirect only when unambiguous.
    if upper.contains("KILL") {
        let kills: Vec<usize> = legal
            .iter()
            .enumerate()
            .filter(|(_, la)| la.action.kind() == ActionKind::Kill)
            .map(|(i, _)| i)
            .collect();
        if let [only] = kills.as_slice() {
            debug!("smart fallback: single kill target");
            return finish(perception, *only, output);
        }
    }

    // Task intent.
    if upper.contains("COMPLETE") || upper.contains("TASK") {
        if let Some(index) = legal.iter().position(|la| {
            matches!(
                la.action.kind(),
                ActionKind::CompleteTask | ActionKind::CompleteFakeTask
            )
        }) {
            return finish(perception, index, output);
        }
    }

    // Voting: aggressive matching, then SKIP -- never a random ballot.
    let vote_indices: Vec<usize> = legal
        .iter()
        .enumerate()
        .filter(|(_, la)| la.action.kind() == ActionKind::Vote)
        .map(|(i, _)| i)
        .collect();
    if !vote_indices.is_empty() {
        if ["SKIP", "ABSTAIN", "NO ONE", "NO VOTE"].iter().any(|kw| upper.contains(kw)) {
            if let Some(index) = legal
                .iter()
                .position(|la| matches!(la.action, Action::Vote { choice: VoteChoice::Skip }))
            {
                return finish(perception, index, output);
            }
        }
        // Target or color words anywhere in the output.
        for &index in &vote_indices {
            let Some(la) = legal.get(index) else { continue };
            if matches!(la.action, Action::Vote { choice: VoteChoice::Player(_) })
                && repr_target(&la.repr).is_some_and(|target| {
                    let target_upper = target.to_uppercase();
                    let color = target_upper.rsplit(' ').next().unwrap_or("");
                    upper.contains(&target_upper) || (!color.is_empty() && upper.contains(color))
                })
            {
                return finish(perception, index, output);
            }
        }
        // Unparseable ballot: SKIP.
        if let Some(index) = legal
            .iter()
            .position(|la| matches!(la.action, Action::Vote { choice: VoteChoice::Skip }))
        {
            debug!("smart fallback: unparseable ballot recorded as SKIP");
            return finish(perception, index, output);
        }
    }

    None
}

/// Build the resolved action, substituting SPEAK payloads and applying the
/// thought-action alignment check.
fn finish(perception: &Perception, index: usize, output: &str) -> Option<Resolved> {
    let la = perception.legal_actions.get(index)?;
    let mut action = la.action.clone();
    if let Action::Speak { message } = &mut action {
        *message = extract_speech(output).unwrap_or_else(|| String::from("..."));
    }
    let mut resolved = Resolved {
        index,
        action,
        repr: la.repr.clone(),
    };

    // Thought-action alignment: reasoning that says "stay" while the
    // resolved action is MOVE overrides to task work (or any non-MOVE).
    if resolved.action.kind() == ActionKind::Move {
        let thinking = output.split("[Action]").next().unwrap_or(output);
        let says_stay = STAY_PATTERNS.iter().any(|p| p.is_match(thinking));
        if says_stay {
            let replacement = perception
                .legal_actions
                .iter()
                .enumerate()
                .find(|(_, la)| la.action.kind() == ActionKind::CompleteTask)
                .or_else(|| {
                    perception
                        .legal_actions
                        .iter()
                        .enumerate()
                        .find(|(_, la)| la.action.kind() != ActionKind::Move)
                });
            if let Some((new_index, la)) = replacement {
                debug!(from = %resolved.repr, to = %la.repr, "thought-action alignment override");
                resolved = Resolved {
                    index: new_index,
                    action: la.action.clone(),
                    repr: la.repr.clone(),
                };
            }
        }
    }

    Some(resolved)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use airlock_types::{LegalAction, PlayerId, Role, RoomId, TaskId};

    use crate::testutil::minimal_perception;

    use super::*;

    fn task_perception() -> Perception {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.legal_actions = vec![
            LegalAction {
                action: Action::Move { to: RoomId(1) },
                repr: String::from("MOVE from Cafeteria to Admin"),
            },
            LegalAction {
                action: Action::Move { to: RoomId(2) },
                repr: String::from("MOVE from Cafeteria to Weapons"),
            },
            LegalAction {
                action: Action::CompleteTask { task: TaskId(0) },
                repr: String::from("COMPLETE TASK - Download Data (requires 2 turns - you must stay in this room)"),
            },
        ];
        perception
    }

    fn voting_perception() -> Perception {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.legal_actions = vec![
            LegalAction {
                action: Action::Vote {
                    choice: VoteChoice::Player(PlayerId(1)),
                },
                repr: String::from("VOTE Player 2: blue"),
            },
            LegalAction {
                action: Action::Vote {
                    choice: VoteChoice::Player(PlayerId(2)),
                },
                repr: String::from("VOTE Player 3: green"),
            },
            LegalAction {
                action: Action::Vote {
                    choice: VoteChoice::Skip,
                },
                repr: String::from("VOTE SKIP"),
            },
        ];
        perception
    }

    #[test]
    fn structured_action_tag_resolves_move() {
        let perception = task_perception();
        let output = normalize_response(
            "[World State Ledger]\nAll quiet.\n[Thinking Process]\nHead to Admin.\n[Action] MOVE from Cafeteria to Admin",
        );
        let resolved = resolve_action(&output, &perception).unwrap();
        assert_eq!(resolved.action, Action::Move { to: RoomId(1) });
    }

    #[test]
    fn bracket_header_misuse_is_normalized() {
        let normalized = normalize_response("[MOVE from Cafeteria to Weapons]");
        assert!(normalized.contains("[Action] MOVE from Cafeteria to Weapons"));
    }

    #[test]
    fn bare_trailing_action_line_is_promoted() {
        let normalized = normalize_response("I think Admin is safest.\nMOVE from Cafeteria to Admin");
        assert!(normalized.contains("[Action] MOVE from Cafeteria to Admin"));
    }

    #[test]
    fn truncation_recovery_extracts_intent() {
        let raw = "The body was in Electrical so I must warn everyone. I should MOVE to Admin because";
        let normalized = normalize_response(raw);
        assert!(normalized.contains("[Action] MOVE TO ADMIN") || normalized.contains("[Action] MOVE to Admin"),
            "got: {normalized}");
        let perception = task_perception();
        let resolved = resolve_action(&normalized, &perception).unwrap();
        assert_eq!(resolved.action, Action::Move { to: RoomId(1) });
    }

    #[test]
    fn keyword_meeting_match() {
        let mut perception = task_perception();
        perception.legal_actions.push(LegalAction {
            action: Action::ReportBody,
            repr: String::from("REPORT DEAD BODY at Cafeteria"),
        });
        let output = normalize_response("There is a body! REPORT DEAD BODY right now!");
        let resolved = resolve_action(&output, &perception).unwrap();
        assert_eq!(resolved.action, Action::ReportBody);
    }

    #[test]
    fn speak_quote_fallback_carries_message() {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.legal_actions = vec![LegalAction {
            action: Action::Speak {
                message: String::from("..."),
            },
            repr: String::from("SPEAK: ..."),
        }];
        let output = normalize_response(
            "THOUGHT: I only know what I saw in Storage.\nSPEAK: \"I was in Storage all game, alone.\"",
        );
        let resolved = resolve_action(&output, &perception).unwrap();
        assert_eq!(
            resolved.action,
            Action::Speak {
                message: String::from("I was in Storage all game, alone.")
            }
        );
    }

    #[test]
    fn smart_fallback_matches_destination_room() {
        let perception = task_perception();
        let resolved =
            resolve_action("I'll head over to Weapons to check on things. MOVE.", &perception)
                .unwrap();
        assert_eq!(resolved.action, Action::Move { to: RoomId(2) });
    }

    #[test]
    fn vote_color_match_and_skip_default() {
        let perception = voting_perception();
        let resolved = resolve_action("[Action] VOTE for green, definitely.", &perception).unwrap();
        assert_eq!(
            resolved.action,
            Action::Vote {
                choice: VoteChoice::Player(PlayerId(2))
            }
        );

        let resolved = resolve_action("I simply cannot decide at all.", &perception).unwrap();
        assert_eq!(
            resolved.action,
            Action::Vote {
                choice: VoteChoice::Skip
            }
        );
    }

    #[test]
    fn vote_skip_keyword() {
        let perception = voting_perception();
        let resolved =
            resolve_action("[Action] VOTE SKIP -- not enough evidence", &perception).unwrap();
        assert_eq!(
            resolved.action,
            Action::Vote {
                choice: VoteChoice::Skip
            }
        );
    }

    #[test]
    fn thought_action_alignment_overrides_move() {
        let perception = task_perception();
        let output = normalize_response(
            "[Thinking Process]\nI must stay and finish my task here.\n[Action] MOVE from Cafeteria to Admin",
        );
        let resolved = resolve_action(&output, &perception).unwrap();
        assert_eq!(resolved.action, Action::CompleteTask { task: TaskId(0) });
    }

    #[test]
    fn garbage_returns_none_for_task_phase() {
        let perception = task_perception();
        assert!(resolve_action("", &perception).is_none());
        assert!(resolve_action("The quick brown fox.", &perception).is_none());
    }

    #[test]
    fn extract_thought_and_speech_from_cot() {
        let raw = "THOUGHT: Blue was with me, vouch for them.\nSPEAK: \"Blue was with me in Medbay.\"";
        assert_eq!(
            extract_thought(raw).as_deref(),
            Some("Blue was with me, vouch for them.")
        );
        assert_eq!(extract_speech(raw).as_deref(), Some("Blue was with me in Medbay."));
    }

    #[test]
    fn structured_task_match_by_name() {
        let perception = task_perception();
        let output = normalize_response("[Action] COMPLETE TASK - Download Data");
        let resolved = resolve_action(&output, &perception).unwrap();
        assert_eq!(resolved.action, Action::CompleteTask { task: TaskId(0) });
    }

    #[test]
    fn kill_single_target_fallback() {
        let mut perception = minimal_perception(Role::Impostor);
        perception.legal_actions = vec![
            LegalAction {
                action: Action::Move { to: RoomId(1) },
                repr: String::from("MOVE from Electrical to Storage"),
            },
            LegalAction {
                action: Action::Kill {
                    victim: PlayerId(4),
                },
                repr: String::from("KILL Player 5: orange"),
            },
        ];
        // The model names a player who does not exist; intent is clear and
        // exactly one target exists.
        let output = normalize_response("[Action] KILL Player 9: silver");
        let resolved = resolve_action(&output, &perception).unwrap();
        assert_eq!(
            resolved.action,
            Action::Kill {
                victim: PlayerId(4)
            }
        );
    }
}
