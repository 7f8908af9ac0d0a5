//! Player state, per-agent memory, and action legality for the Airlock
//! simulation.
//!
//! - [`player`] -- identity, position, aliveness, tasks, death metadata
//! - [`memory`] -- the per-agent verified/hearsay memory and commitment score
//! - [`actions`] -- `can_execute` legality predicates and prompt rendering

pub mod actions;
pub mod error;
pub mod memory;
pub mod player;

pub use actions::{LegalityCtx, action_text, legal_actions, render_action};
pub use error::AgentError;
pub use memory::{FakeEntry, LocationEntry, MemoryState, OwnStatement, SocialEntry, VerifiedEntry};
pub use player::{ActionRecord, Deception, PLAYER_COLORS, Player, PresenceRecord};
