//! Phase-specific prompt addenda: the role-aware briefing blocks appended to
//! the action request.
//!
//! Task phase: impostors get a 3-tier desperation scaling keyed on the global
//! task bar plus a per-target kill-risk matrix; crewmates get a danger block
//! when their self-preservation score crosses the threshold, and hard
//! commitment/crisis directives. Meetings get staged-debate instructions, a
//! per-round discussion role with an anti-parrot speaking style, pre-computed
//! truth checks, and -- for impostors -- the deception ledger.

use std::sync::LazyLock;

use airlock_types::{
    CrisisRole, MeetingRole, MeetingStage, ObservationKind, Perception, Role, TaskStatus,
};
use regex::Regex;
use rust_decimal::Decimal;

/// Danger score at which the crewmate safety block is injected.
const DANGER_THRESHOLD: u8 = 30;

/// Task-bar percentage where impostor play turns aggressive.
const AGGRESSIVE_TASK_PCT: u8 = 50;

/// Task-bar percentage where impostor play turns desperate.
const PANIC_TASK_PCT: u8 = 80;

/// Anti-parrot speaking styles, assigned by a stable hash of the player
/// name so two players with the same discussion role phrase things
/// differently.
const SPEAKING_STYLES: [&str; 5] = [
    "SPEAKING STYLE: Be DIRECT and BRIEF. Short, punchy sentences. Lead with the most important fact.",
    "SPEAKING STYLE: Be DETAILED and METHODICAL. Walk through the evidence step by step.",
    "SPEAKING STYLE: Be EMOTIONAL and URGENT. Use rhetorical questions to drive the point home.",
    "SPEAKING STYLE: Be ANALYTICAL and LOGICAL. Present your reasoning as an if-then chain.",
    "SPEAKING STYLE: Be CONVERSATIONAL and NATURAL. Casual phrasing, accurate facts.",
];

/// FNV-1a over the player name: deterministic across runs, unlike the
/// std hasher's per-process seeding.
fn name_hash(name: &str) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Pick the speaking style for a player.
fn speaking_style(name: &str) -> &'static str {
    let index = usize::try_from(name_hash(name) % 5).unwrap_or(0);
    SPEAKING_STYLES.get(index).copied().unwrap_or(SPEAKING_STYLES[0])
}

/// Whether the player's own name shows up next to accusation vocabulary in
/// recent hearsay.
fn is_accused(perception: &Perception) -> bool {
    let name = perception.self_state.name.to_lowercase();
    let vocab = [
        "suspicious", "impostor", "kill", "vote", "lying", "liar", "accuse", "sus", "eject",
    ];
    perception
        .memory
        .hearsay
        .iter()
        .rev()
        .take(5)
        .any(|entry| {
            let line = entry.claim.to_lowercase();
            line.contains(&name) && vocab.iter().any(|kw| line.contains(kw))
        })
}

/// Whether the player holds eyewitness crime evidence.
fn has_witnessed_crime(perception: &Perception) -> bool {
    perception
        .memory
        .verified
        .iter()
        .any(|entry| entry.kind == ObservationKind::VisualCrime)
}

/// Assign the per-round discussion role from current evidence.
///
/// Recomputed every round -- a bystander accused mid-meeting becomes a
/// defender next round. Impostors never prosecute: presenting hard evidence
/// forcefully draws exactly the scrutiny they need to avoid.
pub fn assign_meeting_role(perception: &Perception) -> MeetingRole {
    let accused = is_accused(perception);
    let witnessed = has_witnessed_crime(perception);
    if perception.self_state.role == Role::Impostor {
        if accused {
            return MeetingRole::Defender;
        }
        // Blend in: alternate detective/bystander by name hash.
        return if name_hash(&perception.self_state.name) % 2 == 0 {
            MeetingRole::Detective
        } else {
            MeetingRole::Bystander
        };
    }
    match (accused, witnessed) {
        (true, true) => MeetingRole::CounterAttacker,
        (true, false) => MeetingRole::Defender,
        (false, true) => MeetingRole::Prosecutor,
        (false, false) => {
            if perception.presence_log.is_empty() {
                MeetingRole::Bystander
            } else {
                MeetingRole::Detective
            }
        }
    }
}

/// Role playbook shown beneath the role assignment.
fn role_playbook(role: MeetingRole) -> &'static str {
    match role {
        MeetingRole::Prosecutor => {
            "You have HARD EVIDENCE of a crime. Present it clearly and forcefully: what you saw, where, and when. Name the player. You are an eyewitness, not guessing."
        }
        MeetingRole::Detective => {
            "You did not witness a crime, but you have location data. Ask targeted questions and hunt for inconsistencies between testimonies. No accusations without evidence."
        }
        MeetingRole::Defender => {
            "You are under suspicion. Defend yourself with SPECIFIC rooms, turns, and tasks. Name players who can vouch for you. Stay calm; panic reads as guilt."
        }
        MeetingRole::Bystander => {
            "You have no strong evidence and are not accused. Listen, compare what others say, and vouch only for locations you can personally confirm. If you have nothing, say so briefly."
        }
        MeetingRole::CounterAttacker => {
            "You are accused AND you hold eyewitness evidence -- you are almost certainly being framed by the killer you caught. Lead with your evidence, then explain the frame job."
        }
    }
}

/// Stage instructions for the staged debate.
fn stage_instructions(stage: MeetingStage) -> &'static str {
    match stage {
        MeetingStage::Testimony => {
            "## STAGE 1: TESTIMONY\nShare FACTS only -- where you were, room by room, and who you saw. If you found a body or witnessed a crime, state exactly what and where. Do NOT accuse anyone yet. Keep it to 2-4 sentences."
        }
        MeetingStage::AccusationDefense => {
            "## STAGE 2: ACCUSATION & DEFENSE\nCompare testimonies and call out CONTRADICTIONS with specifics. If you are accused, answer with your exact location history. If someone already asked a question, do not repeat it -- answer it or react to the answer. Focus on the dead player: who was near them, who has no alibi."
        }
        MeetingStage::FinalArguments => {
            "## STAGE 3: FINAL ARGUMENTS\nLast words before the vote. Summarize the strongest evidence, restate any direct eyewitness testimony, and state your voting intent with a reason. No brand-new accusations; if no hard evidence exists, recommend SKIP."
        }
    }
}

/// Build the task-phase briefing.
pub fn task_phase_briefing(perception: &Perception) -> String {
    let mut out = String::new();
    let me = &perception.self_state;

    out.push_str(&format!("\n## TASK PHASE\nYou are at {}.", me.room));
    if let Some(previous) = &me.previous_room {
        out.push_str(&format!(" You just moved from {previous}."));
    }
    out.push('\n');

    if me.alive {
        out.push_str(
            "REMINDER: You are ALIVE. You are NOT a ghost. Do not reason as if you were dead.\n",
        );
    }

    // Commitment directive.
    let committed = perception.memory.task_commitment >= Decimal::new(8, 1);
    let in_progress = perception
        .tasks
        .iter()
        .find(|t| t.status == TaskStatus::InProgress);
    if let Some(task) = in_progress {
        out.push_str(&format!(
            "\nTASK IN PROGRESS: '{}' has {} turn(s) remaining. You are locked to this room until it finishes; choose COMPLETE TASK to continue. Progress is saved if you are forced out.\n",
            task.name,
            task.turns_remaining.unwrap_or(0)
        ));
    } else if committed {
        out.push_str(
            "\nTASK COMMITMENT: HIGH. A task in this room needs you -- finish it before moving anywhere.\n",
        );
    }

    // Crisis directive.
    match perception.memory.crisis_role {
        Some(CrisisRole::CrisisResponder) => {
            let fix = perception.critical_fix_room.as_deref().unwrap_or("the fix room");
            out.push_str(&format!(
                "\nCRISIS DISPATCH: You are one of the 2 NEAREST players to the sabotage. Drop everything and run to {fix}; choose FIX SABOTAGE when you arrive.\n"
            ));
        }
        Some(CrisisRole::IgnoreAlarm) => {
            out.push_str(
                "\nCRISIS DISPATCH: Other players are closer to the sabotage. IGNORE the alarm and continue your current task.\n",
            );
        }
        None => {}
    }

    match me.role {
        Role::Crewmate => out.push_str(&crewmate_task_briefing(perception)),
        Role::Impostor => out.push_str(&impostor_task_briefing(perception)),
    }
    out
}

/// Crewmate-specific task-phase additions.
fn crewmate_task_briefing(perception: &Perception) -> String {
    let mut out = String::new();

    if let Some(fix_room) = &perception.critical_fix_room {
        out.push_str(&format!(
            "\nEMERGENCY ACTIVE: a critical system is sabotaged. Task actions are disabled until it is fixed. The fix room is {fix_room}.\n"
        ));
    }

    if perception.danger_score >= DANGER_THRESHOLD {
        out.push_str(&format!(
            "\nDANGER SCORE: {}/100. You are exposed -- consider moving toward other players instead of working alone.\n",
            perception.danger_score
        ));
    }

    let all_done = !perception.tasks.is_empty()
        && perception.tasks.iter().all(|t| t.status == TaskStatus::Done);
    if all_done {
        out.push_str(
            "\nALL YOUR TASKS ARE COMPLETE. You are still alive: be a WATCHDOG. Stay with groups, observe, and call a meeting if you see a kill or a vent.\n",
        );
    }
    out
}

/// Impostor-specific task-phase additions: desperation scaling and the
/// kill-risk matrix.
fn impostor_task_briefing(perception: &Perception) -> String {
    let mut out = String::new();
    let task_pct = perception.task_bar_pct.unwrap_or(0);

    if task_pct >= PANIC_TASK_PCT {
        out.push_str(&format!(
            "\nPANIC PHASE -- TASK BAR AT {task_pct}%. You are about to lose. KILL IMMEDIATELY, ignore witnesses; there is no later.\n"
        ));
    } else if task_pct >= AGGRESSIVE_TASK_PCT {
        out.push_str(&format!(
            "\nAGGRESSIVE PHASE -- TASK BAR AT {task_pct}%. The crew is winning. Take risks: a kill with one witness is acceptable if you can blame them. Use sabotage to scatter the crew.\n"
        ));
    } else {
        out.push_str(&format!(
            "\nSTEALTH PHASE -- TASK BAR AT {task_pct}%. Play it safe: isolate targets, fake tasks for your alibi, and do not kill with witnesses unless you can vent away.\n"
        ));
    }

    let matrix = kill_risk_matrix(perception);
    if !matrix.is_empty() {
        out.push_str("\nKILL RISK MATRIX (lowest risk first):\n");
        out.push_str("| Target | Witnesses | Exposure | Vent escape | Risk |\n");
        for entry in &matrix {
            out.push_str(&format!(
                "| {} | {} | {:.0}% | {} | {:.2} |\n",
                entry.target,
                entry.witnesses,
                entry.exposure * 100.0,
                if entry.vent_escape { "yes" } else { "no" },
                entry.risk
            ));
        }
        out.push_str("Pick the lowest risk. Above 0.6: do not kill. Below 0.3: safe.\n");
    }
    out
}

/// One row of the impostor kill-risk matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct KillRisk {
    /// The candidate victim's name.
    pub target: String,
    /// Co-located players who would witness the kill.
    pub witnesses: usize,
    /// Fraction of recorded ticks the target has been co-located with us.
    pub exposure: f64,
    /// Whether a vent escape exists from this room.
    pub vent_escape: bool,
    /// Composite risk score in `[0, 1]`.
    pub risk: f64,
}

/// Compute per-target kill risk from the perception payload.
///
/// Witness risk scales at 0.35 per witness, exposure contributes 0.4, and a
/// missing vent escape adds a flat 0.25.
pub fn kill_risk_matrix(perception: &Perception) -> Vec<KillRisk> {
    let targets: Vec<String> = perception
        .legal_actions
        .iter()
        .filter(|la| matches!(la.action, airlock_types::Action::Kill { .. }))
        .filter_map(|la| la.repr.strip_prefix("KILL "))
        .map(ToOwned::to_owned)
        .collect();
    if targets.is_empty() {
        return Vec::new();
    }
    let vent_escape = perception
        .legal_actions
        .iter()
        .any(|la| matches!(la.action, airlock_types::Action::Vent { .. }));
    let witnesses = targets.len().saturating_sub(1);

    let total_entries = u32::try_from(perception.presence_log.len().max(1)).unwrap_or(u32::MAX);
    let mut rows: Vec<KillRisk> = targets
        .into_iter()
        .map(|target| {
            let colocated = perception
                .presence_log
                .iter()
                .filter(|entry| entry.players_seen.iter().any(|seen| seen == &target))
                .count();
            let colocated = u32::try_from(colocated).unwrap_or(u32::MAX);
            let exposure = (f64::from(colocated) / f64::from(total_entries)).min(1.0);
            let witness_count = u32::try_from(witnesses).unwrap_or(u32::MAX);
            let witness_risk = (f64::from(witness_count) * 0.35).min(1.0);
            let escape = if vent_escape { 0.0 } else { 0.25 };
            let risk = (witness_risk + 0.4 * exposure + escape).min(1.0);
            KillRisk {
                target,
                witnesses,
                exposure,
                vent_escape,
                risk,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.risk.total_cmp(&b.risk));
    rows
}

static LOCATION_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    // The room capture stops at punctuation or at connective words, so
    // "I was in Admin at T2 doing Upload Data" yields "Admin".
    crate::parse::compile(
        r#"(Player \d+: \w+) said:.*?I was (?:in|at) ([A-Za-z0-9 ]+?)(?:\s+(?:at|doing|and|with)\b|[.,"]|$)"#,
    )
});

static TURN_REF: LazyLock<Regex> =
    LazyLock::new(|| crate::parse::compile(r"(?i)(?:T|turn|timestep)\s*(\d+)"));

/// Pre-computed contradiction analysis for meetings.
///
/// Cross-references other players' spoken location claims against the
/// listener's own presence log and renders HARD LIE / CONFIRMED lines. The
/// model is bad at doing this join itself; handing it the result keeps
/// meetings grounded.
pub fn truth_check_block(perception: &Perception) -> String {
    let mut lines = Vec::new();
    for entry in &perception.memory.hearsay {
        let Some(caps) = LOCATION_CLAIM.captures(&entry.claim) else {
            continue;
        };
        let (Some(claimer), Some(room)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let claimer = claimer.as_str();
        if claimer == perception.self_state.name {
            continue;
        }
        let claimed_room = room.as_str().trim();
        let turn = TURN_REF
            .captures(&entry.claim)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok());
        let Some(turn) = turn else {
            continue;
        };
        let Some(mine) = perception.presence_log.iter().find(|p| p.tick == turn) else {
            continue;
        };
        if !mine.room.eq_ignore_ascii_case(claimed_room) {
            // I was elsewhere: I have no information about that room.
            continue;
        }
        let saw_them = mine.players_seen.iter().any(|seen| seen == claimer);
        if saw_them {
            lines.push(format!(
                "CONFIRMED: {claimer} claims {claimed_room} at T{turn} -- I was there and DID see them."
            ));
        } else {
            lines.push(format!(
                "HARD LIE: {claimer} claims {claimed_room} at T{turn} -- I was there and did NOT see them."
            ));
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n[CONTRADICTION CHECK -- engine-verified cross-reference]\n");
    for line in lines {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Build the discussion-round briefing.
pub fn meeting_briefing(perception: &Perception) -> String {
    let Some(meeting) = &perception.meeting else {
        return String::new();
    };
    let mut out = String::new();
    out.push('\n');
    out.push_str(stage_instructions(meeting.stage));
    out.push('\n');

    // Role assignment from stage 1 on; testimony is role-free.
    if meeting.stage != MeetingStage::Testimony {
        let role = assign_meeting_role(perception);
        out.push_str(&format!(
            "\n## YOUR DISCUSSION ROLE: {}\n{}\n{}\n",
            role.label(),
            role_playbook(role),
            speaking_style(&perception.self_state.name)
        ));
        out.push_str(&truth_check_block(perception));
    }

    // The alibi ledger: engine-recorded rooms the player may claim.
    if !perception.presence_log.is_empty() {
        out.push_str("\n## YOUR LOCATION HISTORY (rooms YOU personally visited):\n");
        out.push_str("This ONLY covers rooms you were in. You have NO information about other rooms.\n");
        for entry in perception.presence_log.iter().rev().take(10).rev() {
            if entry.players_seen.is_empty() {
                out.push_str(&format!(
                    "  T{}: I was at {} -- no one else was there\n",
                    entry.tick, entry.room
                ));
            } else {
                out.push_str(&format!(
                    "  T{}: I was at {} and saw {}\n",
                    entry.tick,
                    entry.room,
                    entry.players_seen.join(", ")
                ));
            }
        }
    }

    // Impostor deception ledger.
    if let Some(ledger) = &perception.deception {
        if let (Some(victim), Some(kill_room), Some(alibi)) =
            (&ledger.victim, &ledger.kill_room, &ledger.public_alibi)
        {
            out.push_str(&format!(
                "\n## YOUR DECEPTION LEDGER (PRIVATE -- never reveal)\n- You killed {victim} at {kill_room}.\n- PUBLIC ALIBI: claim you were in {alibi}.\n- FORBIDDEN: 'I killed', any mention of {kill_room} as your own location.\n"
            ));
        }
        if !ledger.fake_memory.is_empty() {
            out.push_str("\n## YOUR FAKE ALIBI TIMELINE (stick to this story)\n");
            for entry in ledger.fake_memory.iter().rev().take(5).rev() {
                out.push_str(&format!("  T{}: {} ({})\n", entry.turn, entry.room, entry.activity));
            }
        }
    }

    // Self-consistency: replay own prior claims.
    if !perception.memory.own_claims.is_empty() {
        out.push_str("\n## CONSISTENCY CHECK (your own previous statements)\n");
        out.push_str("Do NOT contradict yourself. Build on these, never retract without new hard evidence:\n");
        for claim in perception.memory.own_claims.iter().rev().take(4).rev() {
            out.push_str(&format!("  T{}: \"{}\"\n", claim.tick, claim.claim));
        }
    }

    out.push_str(
        "\nRespond in the Chain-of-Thought format:\nTHOUGHT: <your private reasoning, referencing your verified history>\nSPEAK: \"<what you say out loud>\"\n",
    );
    out
}

/// Build the voting-turn briefing.
pub fn voting_briefing(perception: &Perception) -> String {
    let mut out = String::from("\n## VOTING PHASE\nCast exactly one ballot.\n");

    let crime_evidence: Vec<&str> = perception
        .memory
        .verified
        .iter()
        .filter(|e| e.kind == ObservationKind::VisualCrime)
        .map(|e| e.event.as_str())
        .collect();
    if !crime_evidence.is_empty() {
        out.push_str("\nYOUR HARD MEMORY -- THIS OVERRIDES EVERYTHING SAID IN DISCUSSION:\n");
        for event in crime_evidence.iter().take(6) {
            out.push_str(&format!("  {event}\n"));
        }
        out.push_str("Vote on THIS evidence, not on what other players claimed.\n");
    }

    if perception.self_state.role == Role::Impostor {
        out.push_str(
            "\nIMPOSTOR VOTING STRATEGY: never vote for yourself or a fellow Impostor; vote with the group consensus against a Crewmate to blend in.\n",
        );
    }

    out.push_str("\nYour [Action] line MUST be one of:\n");
    for la in &perception.legal_actions {
        out.push_str(&format!("  {}\n", la.repr));
    }
    out.push_str("Do NOT output any other action type or any player not listed above.\n");
    out
}

#[cfg(test)]
mod tests {
    use airlock_types::{HearsayEntry, PresenceEntry, VerifiedObservation};

    use crate::testutil::minimal_perception;

    use super::*;

    #[test]
    fn speaking_style_is_stable_per_name() {
        let a1 = speaking_style("Player 1: red");
        let a2 = speaking_style("Player 1: red");
        assert_eq!(a1, a2);
    }

    #[test]
    fn witness_becomes_prosecutor() {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.memory.verified.push(VerifiedObservation {
            tick: 3,
            event: String::from("[CONFIRMED EYEWITNESS] saw the kill"),
            kind: ObservationKind::VisualCrime,
            location: String::from("Electrical"),
        });
        assert_eq!(assign_meeting_role(&perception), MeetingRole::Prosecutor);
    }

    #[test]
    fn accused_witness_counter_attacks() {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.memory.verified.push(VerifiedObservation {
            tick: 3,
            event: String::from("[CONFIRMED EYEWITNESS] saw the kill"),
            kind: ObservationKind::VisualCrime,
            location: String::from("Electrical"),
        });
        perception.memory.hearsay.push(HearsayEntry {
            tick: 4,
            speaker: String::from("Player 2: blue"),
            claim: String::from("Player 2: blue said: \"Player 1: red is suspicious, vote them\""),
        });
        assert_eq!(assign_meeting_role(&perception), MeetingRole::CounterAttacker);
    }

    #[test]
    fn impostor_never_prosecutes() {
        let mut perception = minimal_perception(Role::Impostor);
        perception.memory.verified.push(VerifiedObservation {
            tick: 3,
            event: String::from("[CONFIRMED EYEWITNESS] saw something"),
            kind: ObservationKind::VisualCrime,
            location: String::from("Electrical"),
        });
        let role = assign_meeting_role(&perception);
        assert_ne!(role, MeetingRole::Prosecutor);
    }

    #[test]
    fn truth_check_flags_hard_lie_and_confirmation() {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.presence_log.push(PresenceEntry {
            tick: 2,
            room: String::from("Admin"),
            players_seen: vec![String::from("Player 3: green")],
        });
        // A lie: claims Admin at T2 but I was there and did not see them.
        perception.memory.hearsay.push(HearsayEntry {
            tick: 5,
            speaker: String::from("Player 2: blue"),
            claim: String::from(
                "[Discussion Round 1] Player 2: blue said: \"I was in Admin at T2 doing Upload Data.\"",
            ),
        });
        // The truth: I did see Player 3 there.
        perception.memory.hearsay.push(HearsayEntry {
            tick: 5,
            speaker: String::from("Player 3: green"),
            claim: String::from(
                "[Discussion Round 1] Player 3: green said: \"I was in Admin at turn 2.\"",
            ),
        });

        let block = truth_check_block(&perception);
        assert!(block.contains("HARD LIE: Player 2: blue"));
        assert!(block.contains("CONFIRMED: Player 3: green"));
    }

    #[test]
    fn truth_check_silent_about_unvisited_rooms() {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.presence_log.push(PresenceEntry {
            tick: 2,
            room: String::from("Cafeteria"),
            players_seen: Vec::new(),
        });
        perception.memory.hearsay.push(HearsayEntry {
            tick: 5,
            speaker: String::from("Player 2: blue"),
            claim: String::from("Player 2: blue said: \"I was in Admin at T2.\""),
        });
        assert!(truth_check_block(&perception).is_empty());
    }

    #[test]
    fn desperation_tiers_follow_task_bar() {
        let mut perception = minimal_perception(Role::Impostor);
        perception.task_bar_pct = Some(10);
        assert!(impostor_task_briefing(&perception).contains("STEALTH PHASE"));
        perception.task_bar_pct = Some(65);
        assert!(impostor_task_briefing(&perception).contains("AGGRESSIVE PHASE"));
        perception.task_bar_pct = Some(85);
        assert!(impostor_task_briefing(&perception).contains("PANIC PHASE"));
    }

    #[test]
    fn danger_block_only_at_threshold() {
        let mut perception = minimal_perception(Role::Crewmate);
        perception.danger_score = 20;
        assert!(!crewmate_task_briefing(&perception).contains("DANGER SCORE"));
        perception.danger_score = 45;
        assert!(crewmate_task_briefing(&perception).contains("DANGER SCORE: 45/100"));
    }

    #[test]
    fn kill_risk_orders_by_risk_and_caps_at_one() {
        let mut perception = minimal_perception(Role::Impostor);
        perception.presence_log.push(PresenceEntry {
            tick: 1,
            room: String::from("Electrical"),
            players_seen: vec![String::from("Player 2: blue")],
        });
        perception.presence_log.push(PresenceEntry {
            tick: 2,
            room: String::from("Electrical"),
            players_seen: vec![String::from("Player 2: blue")],
        });
        perception.legal_actions.push(airlock_types::LegalAction {
            action: airlock_types::Action::Kill {
                victim: airlock_types::PlayerId(1),
            },
            repr: String::from("KILL Player 2: blue"),
        });
        perception.legal_actions.push(airlock_types::LegalAction {
            action: airlock_types::Action::Kill {
                victim: airlock_types::PlayerId(2),
            },
            repr: String::from("KILL Player 3: green"),
        });

        let matrix = kill_risk_matrix(&perception);
        assert_eq!(matrix.len(), 2);
        // The never-co-located target is lower risk than the constant shadow.
        assert_eq!(matrix.first().map(|r| r.target.as_str()), Some("Player 3: green"));
        for row in &matrix {
            assert!(row.risk <= 1.0);
            assert_eq!(row.witnesses, 1);
            // No vent available in this fixture.
            assert!(!row.vent_escape);
        }
    }
}
