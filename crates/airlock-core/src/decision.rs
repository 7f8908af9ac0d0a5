//! The decision seam between the engine and whatever drives the agents.
//!
//! During the decide stage the engine presents each agent with a
//! [`Perception`] payload and awaits an [`Action`] in response. The
//! [`DecisionSource`] trait abstracts the mechanism -- an LLM runner, a
//! scripted test driver, or a uniform-random bot. The trait is synchronous;
//! async implementations (the LLM runner) bridge internally into their own
//! runtime and fan the per-agent calls out in parallel.

use std::collections::{BTreeMap, VecDeque};

use airlock_types::{Action, PlayerId, VoteChoice};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom as _;
use rand::SeedableRng as _;
use tracing::warn;

use airlock_agents::Player;

/// Errors that can occur during the decision phase.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// An agent did not produce a decision in time.
    #[error("agent {agent} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The agent that timed out.
        agent: PlayerId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// An internal error in the decision source.
    #[error("decision source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// One decision request: the filtered world view for one agent.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// The deciding player.
    pub player: PlayerId,
    /// The epistemically filtered view, including the legal action list.
    pub perception: airlock_types::Perception,
}

/// A source of agent decisions.
///
/// Individual agent failures must be absorbed by the implementation (by
/// falling back to the first legal action); an error return aborts the tick.
/// `Send` so a whole game can run on a blocking thread.
pub trait DecisionSource: Send {
    /// Decide for a single agent. Used in meetings, where speaking order is
    /// sequential and each speaker sees what earlier speakers said.
    fn decide(&mut self, request: &DecisionRequest) -> Result<Action, DecisionError>;

    /// Collect decisions for a whole tick.
    ///
    /// The default implementation is sequential; parallel implementations
    /// override this (all decisions are functions of the same tick-start
    /// world, so order cannot matter).
    fn collect(
        &mut self,
        requests: &[DecisionRequest],
    ) -> Result<BTreeMap<PlayerId, Action>, DecisionError> {
        let mut decisions = BTreeMap::new();
        for request in requests {
            decisions.insert(request.player, self.decide(request)?);
        }
        Ok(decisions)
    }

    /// Identifier written to the game summary (model name or driver kind).
    fn model_name(&self) -> String {
        String::from("scripted")
    }
}

impl DecisionSource for Box<dyn DecisionSource> {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        self.as_mut().decide(request)
    }

    fn collect(
        &mut self,
        requests: &[DecisionRequest],
    ) -> Result<BTreeMap<PlayerId, Action>, DecisionError> {
        self.as_mut().collect(requests)
    }

    fn model_name(&self) -> String {
        self.as_ref().model_name()
    }
}

/// Always chooses the first legal action.
///
/// The engine's ultimate fallback behavior, packaged as a source so the tick
/// cycle can be exercised end-to-end without an LLM.
#[derive(Debug, Clone, Default)]
pub struct FirstLegalSource;

impl FirstLegalSource {
    /// Create a new first-legal source.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionSource for FirstLegalSource {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        request
            .perception
            .legal_actions
            .first()
            .map(|la| la.action.clone())
            .ok_or(DecisionError::Internal {
                message: format!("no legal actions for {}", request.player),
            })
    }
}

/// Replays pre-scripted actions per player, falling back to the first legal
/// action when a script runs dry. Drives the deterministic scenario tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    scripts: BTreeMap<PlayerId, VecDeque<Action>>,
}

impl ScriptedSource {
    /// Create an empty scripted source.
    pub const fn new() -> Self {
        Self {
            scripts: BTreeMap::new(),
        }
    }

    /// Queue the next action for a player.
    pub fn push(&mut self, player: PlayerId, action: Action) {
        self.scripts.entry(player).or_default().push_back(action);
    }
}

impl DecisionSource for ScriptedSource {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        if let Some(script) = self.scripts.get_mut(&request.player)
            && let Some(action) = script.pop_front()
        {
            return Ok(action);
        }
        FirstLegalSource::new().decide(request)
    }
}

/// Chooses uniformly among the legal actions with a seeded generator.
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Create a random source from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DecisionSource for RandomSource {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        request
            .perception
            .legal_actions
            .choose(&mut self.rng)
            .map(|la| la.action.clone())
            .ok_or(DecisionError::Internal {
                message: format!("no legal actions for {}", request.player),
            })
    }

    fn model_name(&self) -> String {
        String::from("random")
    }
}

/// Coerce a proposed action into the legal set.
///
/// This is the engine-side defense-in-depth stack:
///
/// 1. **Ghost guard** -- a dead player proposing anything outside the ghost
///    allowlist is rewritten to the first legal ghost action, or the turn is
///    dropped when none exists.
/// 2. **Phase guard** -- a proposal not in the legal set is hard-rejected
///    when it would trigger a meeting; otherwise the engine picks the first
///    legal instance of the same kind and logs a warning.
/// 3. **No-skip** -- a missing proposal becomes the first legal action.
///
/// Returns `None` only when the player has no usable legal action at all.
pub fn normalize_decision(
    player: &Player,
    legal: &[Action],
    proposed: Option<Action>,
) -> Option<Action> {
    let first_legal = legal.first().cloned();

    let Some(action) = proposed else {
        if let Some(fallback) = &first_legal {
            warn!(player = %player.name, fallback = ?fallback.kind(), "no-skip: forcing first legal action");
        }
        return first_legal;
    };

    if !player.alive && !action.kind().ghost_allowed() {
        let ghost = legal.iter().find(|a| a.kind().ghost_allowed()).cloned();
        match &ghost {
            Some(replacement) => warn!(
                player = %player.name,
                tried = action.kind().name(),
                took = replacement.kind().name(),
                "ghost guard: rewriting dead player's action"
            ),
            None => warn!(player = %player.name, "ghost guard: no valid ghost action, skipping turn"),
        }
        return ghost;
    }

    if legal.contains(&action) {
        return Some(action);
    }

    if action.kind().triggers_meeting() {
        warn!(
            player = %player.name,
            tried = action.kind().name(),
            "phase guard: meeting trigger not in legal set, hard-rejected"
        );
        return first_legal;
    }

    if let Some(same_kind) = legal.iter().find(|a| a.kind() == action.kind()).cloned() {
        warn!(
            player = %player.name,
            kind = action.kind().name(),
            "phase guard: payload not in legal set, taking closest same-kind instance"
        );
        return Some(same_kind);
    }

    warn!(
        player = %player.name,
        tried = action.kind().name(),
        "phase guard: action kind not legal, falling back"
    );
    first_legal
}

/// Coerce a voting-phase proposal into a ballot. Anything that is not a
/// legal VOTE becomes a SKIP -- never a random target.
pub fn normalize_vote(player: &Player, legal: &[Action], proposed: Option<Action>) -> VoteChoice {
    if let Some(action) = proposed {
        if let Action::Vote { choice } = &action
            && legal.contains(&action)
        {
            return *choice;
        }
        warn!(
            player = %player.name,
            tried = action.kind().name(),
            "vote guard: invalid ballot, recording SKIP"
        );
    } else {
        warn!(player = %player.name, "vote guard: no ballot, recording SKIP");
    }
    VoteChoice::Skip
}

/// Build a speech action from whatever the source proposed.
///
/// Discussion turns must produce a SPEAK; anything else is replaced with a
/// placeholder utterance (matching the engine's no-skip rule for meetings).
pub fn normalize_speech(player: &Player, proposed: Option<Action>) -> Action {
    match proposed {
        Some(Action::Speak { message }) => Action::Speak { message },
        other => {
            warn!(
                player = %player.name,
                tried = other.as_ref().map(|a| a.kind().name()),
                "meeting guard: forcing SPEAK"
            );
            Action::Speak {
                message: String::from("..."),
            }
        }
    }
}
