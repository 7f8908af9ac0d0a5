//! The LLM-backed decision source.
//!
//! Implements the engine's [`DecisionSource`] seam: perceptions go in,
//! legal actions come out. Internally each decision is prompt assembly ->
//! LLM call -> speaking-score firewall (discussion only) -> response
//! parsing, with the first legal action as the ultimate fallback at every
//! failure point -- a malformed or absent response never crashes a tick.
//!
//! The trait is synchronous; this source bridges into the tokio runtime it
//! was created on (the engine loop runs on a blocking thread) and fans the
//! per-tick decisions out concurrently, since every agent's call is
//! independent and network-bound. All observable state changes stay
//! serialized in the engine.

use std::collections::BTreeMap;

use airlock_core::decision::{DecisionError, DecisionRequest, DecisionSource};
use airlock_events::{InteractionRecord, JsonlWriter, LlmInteraction};
use airlock_types::{Action, PlayerId};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::llm::{ChatMessage, LlmBackend};
use crate::parse;
use crate::prompt::PromptEngine;
use crate::score::{self, SpeechScorer};

/// Discussion regeneration attempts after a rejected speech (3 total).
const SPEECH_RETRIES: usize = 2;

/// Sampling temperature for task-phase and discussion decisions.
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Lower sampling temperature for voting: more deterministic logic.
const VOTE_TEMPERATURE: f64 = 0.5;

/// An LLM-driven [`DecisionSource`].
pub struct LlmDecisionSource {
    backend: LlmBackend,
    prompts: PromptEngine,
    scorer: SpeechScorer,
    handle: tokio::runtime::Handle,
    interactions: Option<JsonlWriter>,
    game_index: u32,
}

/// The outcome of one decision, before logging.
struct DecisionTrace {
    action: Option<Action>,
    record: Option<InteractionRecord>,
}

impl LlmDecisionSource {
    /// Create a source bound to the given runtime handle.
    ///
    /// `room_names` feeds the speaking-score pattern bank, compiled once
    /// here and reused for every speech.
    pub fn new(
        backend: LlmBackend,
        room_names: &[String],
        handle: tokio::runtime::Handle,
        game_index: u32,
    ) -> Result<Self, RunnerError> {
        Ok(Self {
            backend,
            prompts: PromptEngine::new()?,
            scorer: SpeechScorer::new(room_names),
            handle,
            interactions: None,
            game_index,
        })
    }

    /// Attach a per-decision interaction log.
    #[must_use]
    pub fn with_interaction_log(mut self, writer: JsonlWriter) -> Self {
        self.interactions = Some(writer);
        self
    }

    /// First legal action of a request, used at every fallback point.
    fn first_legal(request: &DecisionRequest) -> Option<Action> {
        request
            .perception
            .legal_actions
            .first()
            .map(|la| la.action.clone())
    }

    /// One full decision: prompt, call, firewall, parse.
    async fn decide_async(&self, request: &DecisionRequest) -> DecisionTrace {
        let perception = &request.perception;
        let player = perception.self_state.name.clone();

        let messages = match self.prompts.assemble(perception) {
            Ok(messages) => messages,
            Err(err) => {
                warn!(%player, %err, "prompt assembly failed, using first legal action");
                return DecisionTrace {
                    action: Self::first_legal(request),
                    record: None,
                };
            }
        };

        let temperature = if perception.is_voting() {
            VOTE_TEMPERATURE
        } else {
            DEFAULT_TEMPERATURE
        };

        let response = match self.backend.complete(&messages, temperature).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%player, %err, "llm call failed after retries, using first legal action");
                return DecisionTrace {
                    action: Self::first_legal(request),
                    record: self.make_record(request, &messages, "", None, None, "[LLM FAILURE]"),
                };
            }
        };
        if response.truncated() {
            warn!(%player, "response truncated at the token limit");
        }
        let mut raw = response.text;

        // The speaking-score firewall, discussion turns only.
        if perception.is_discussion() {
            raw = self
                .speech_firewall(request, &messages, raw, temperature)
                .await;
        }

        let output = parse::normalize_response(&raw);
        let thought = parse::extract_thought(&raw);
        let speech = parse::extract_speech(&raw);

        let (action, resolved_repr) = match parse::resolve_action(&output, perception) {
            Some(resolved) => {
                debug!(%player, repr = %resolved.repr, "action resolved");
                (Some(resolved.action), resolved.repr)
            }
            None => {
                let fallback = Self::first_legal(request);
                warn!(%player, "response unresolvable, falling back to first legal action");
                let repr = perception
                    .legal_actions
                    .first()
                    .map_or_else(String::new, |la| la.repr.clone());
                (fallback, repr)
            }
        };

        let record = self.make_record(request, &messages, &raw, thought, speech, &resolved_repr);
        DecisionTrace { action, record }
    }

    /// Score generated speech against ground truth; regenerate with a
    /// correction on violations; substitute the safe fallback when all
    /// attempts score negative.
    async fn speech_firewall(
        &self,
        request: &DecisionRequest,
        messages: &[ChatMessage],
        raw: String,
        temperature: f64,
    ) -> String {
        let perception = &request.perception;
        let player = &perception.self_state.name;
        let truths = score::compute_valid_truths(perception);

        let Some(speech) = parse::extract_speech(&raw) else {
            return raw;
        };
        let (mut best_score, mut breakdown) = self.scorer.score(&speech, &truths);
        info!(%player, score = best_score, "speech scored");
        if best_score >= 0 {
            return raw;
        }

        let mut best_raw = raw;
        for attempt in 0..SPEECH_RETRIES {
            let correction = score::correction_text(&breakdown);
            let mut regen = messages.to_vec();
            if let Some(last) = regen.last_mut() {
                last.content.push_str(&format!(
                    "\n\nSPEECH CORRECTION (attempt {}/3): your previous speech was rejected. {correction} Generate a new speech based ONLY on your firsthand experience.",
                    attempt.saturating_add(2)
                ));
            }
            let Ok(retry) = self.backend.complete(&regen, temperature).await else {
                continue;
            };
            let Some(retry_speech) = parse::extract_speech(&retry.text) else {
                continue;
            };
            let (retry_score, retry_breakdown) = self.scorer.score(&retry_speech, &truths);
            info!(%player, attempt, score = retry_score, "speech rescored");
            if retry_score > best_score {
                best_score = retry_score;
                best_raw = retry.text;
                breakdown = retry_breakdown;
            }
            if best_score >= 0 {
                return best_raw;
            }
        }

        // All attempts scored negative: substitute the safe utterance.
        warn!(%player, score = best_score, "all speech attempts rejected, forcing safe fallback");
        format!(
            "[Action] SPEAK: \"{}\"",
            score::safe_fallback(truths.is_impostor)
        )
    }

    /// Build the interaction-log record for one decision.
    fn make_record(
        &self,
        request: &DecisionRequest,
        messages: &[ChatMessage],
        raw: &str,
        thought: Option<String>,
        speech: Option<String>,
        resolved: &str,
    ) -> Option<InteractionRecord> {
        self.interactions.as_ref()?;
        let system_prompt = messages
            .first()
            .map_or_else(String::new, |m| m.content.clone());
        let user_messages: Vec<&ChatMessage> =
            messages.iter().filter(|m| m.role != "system").collect();
        Some(InteractionRecord {
            game_index: self.game_index,
            step: request.perception.tick,
            timestamp: Utc::now(),
            player: request.perception.self_state.name.clone(),
            interaction: LlmInteraction {
                system_prompt,
                prompt: serde_json::to_value(user_messages).unwrap_or_default(),
                response: serde_json::json!({
                    "thought": thought,
                    "speech": speech,
                }),
                full_response: raw.to_owned(),
                resolved_action: resolved.to_owned(),
            },
        })
    }

    /// Write a finished record to the interaction log.
    fn log_record(&mut self, record: Option<InteractionRecord>) {
        if let (Some(writer), Some(record)) = (self.interactions.as_mut(), record)
            && let Err(err) = writer.append(&record)
        {
            warn!(%err, "interaction log write failed");
        }
    }
}

impl DecisionSource for LlmDecisionSource {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Action, DecisionError> {
        let trace = self.handle.clone().block_on(self.decide_async(request));
        self.log_record(trace.record);
        trace.action.ok_or(DecisionError::Internal {
            message: format!("no legal actions for {}", request.player),
        })
    }

    fn collect(
        &mut self,
        requests: &[DecisionRequest],
    ) -> Result<BTreeMap<PlayerId, Action>, DecisionError> {
        // All decisions are functions of the same tick-start world, so the
        // network-bound calls run concurrently; the engine serializes every
        // mutation afterwards.
        let traces = self.handle.clone().block_on(async {
            futures::future::join_all(requests.iter().map(|request| self.decide_async(request)))
                .await
        });

        let mut decisions = BTreeMap::new();
        for (request, trace) in requests.iter().zip(traces) {
            self.log_record(trace.record);
            if let Some(action) = trace.action {
                decisions.insert(request.player, action);
            }
        }
        Ok(decisions)
    }

    fn model_name(&self) -> String {
        self.backend.model().to_owned()
    }
}
