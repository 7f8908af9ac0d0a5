//! The Airlock engine: phase scheduling, perception, and game control.
//!
//! Three tightly coupled subsystems live here:
//!
//! - the **phase scheduler** ([`tick`] and [`meeting`]): a strict state
//!   machine over task and meeting phases, with the 4-stage per-tick
//!   resolver that guarantees kill-witness and phase-transition correctness
//! - the **perception and message routing layer** ([`perception`] and
//!   [`router`]): the line-of-sight filter and the sole writer of every
//!   agent's verified/hearsay memory
//! - the **decision seam and guards** ([`decision`]): the contract with
//!   whatever drives the agents, plus the ghost/phase/no-skip guards that
//!   coerce adversarial output into legal actions
//!
//! [`game`] ties them together into a run-to-completion controller.

pub mod activity;
pub mod crisis;
pub mod decision;
pub mod error;
pub mod game;
pub mod meeting;
pub mod perception;
pub mod router;
pub mod state;
pub mod tick;

pub use activity::{ActivitySink, NullSink, VecSink};
pub use decision::{
    DecisionError, DecisionRequest, DecisionSource, FirstLegalSource, RandomSource,
    ScriptedSource,
};
pub use error::EngineError;
pub use game::GameController;
pub use state::GameState;
pub use tick::{TickOutcome, run_task_tick};
