//! The blocking dispatch engine.
//!
//! [`StateMachine`] owns the state registry and the active-state pointer;
//! [`State`] owns one state's trigger-kind handler chains. Handler
//! transforms run to completion on the dispatching thread, and one external
//! `dispatch`/`start` call is serialized against all others for its whole
//! forwarding chain.

pub(crate) mod cell;
mod driver;
mod state;

pub use driver::StateMachine;
pub use state::State;
