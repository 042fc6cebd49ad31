//! Core vocabulary of the engine.
//!
//! This module contains the types the two engines share:
//! - State identity via the [`StateToken`] marker trait
//! - Guard predicates evaluated at dispatch time
//! - The [`TriggerOutcome`] value produced by handler resolution
//! - The built-in enter/exit notification triggers
//! - Transition records and the append-only log

pub(crate) mod guard;
pub(crate) mod history;
pub(crate) mod outcome;
pub(crate) mod token;
pub(crate) mod triggers;

pub use guard::Guard;
pub use history::{TransitionLog, TransitionRecord};
pub use outcome::TriggerOutcome;
pub use token::StateToken;
pub use triggers::{StateEntered, StateExited};
