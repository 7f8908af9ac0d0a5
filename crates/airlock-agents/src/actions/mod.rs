//! The action library: per-variant legality and prompt rendering.
//!
//! Legality computes the *concrete legal instances* of every action variant
//! for one player against the current world (phase, adjacency, occupancy,
//! cooldowns, sabotage state). Rendering turns a typed instance into the
//! exact string shown in the "Available actions" list; the response parser
//! matches model output against those strings.

pub mod legality;
pub mod render;

pub use legality::{LegalityCtx, legal_actions};
pub use render::{action_text, render_action};
