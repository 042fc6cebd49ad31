//! Trigfsm: a trigger-dispatching finite state machine engine
//!
//! Trigfsm drives explicit, inspectable state management without hand-rolled
//! switch statements. Callers configure states at runtime, register the
//! trigger kinds each state reacts to (with optional guards), and then feed
//! trigger values into the machine. The engine routes each trigger to the
//! handler chain registered for its kind, applies at most one resulting
//! transition, and brackets every transition with automatic
//! [`StateExited`]/[`StateEntered`] notifications.
//!
//! # Core Concepts
//!
//! - **Token**: an opaque caller-supplied value (usually an enum) that
//!   identifies a state; see [`StateToken`]
//! - **Trigger**: any value dispatched into the machine, routed by its type
//! - **Handler**: a `(guard, transform, forward)` triple registered on one
//!   `(state, trigger kind)` pair
//! - **Forwarding**: redelivery of the same trigger into the state a handler
//!   just transitioned to
//!
//! # Example
//!
//! ```rust
//! use trigfsm::StateMachine;
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum Door {
//!     Closed,
//!     Open,
//! }
//!
//! struct Push;
//!
//! let machine = StateMachine::new(Door::Closed);
//! machine.configure(Door::Closed).transition_to::<Push>(Door::Open);
//! machine.configure(Door::Open).transition_to::<Push>(Door::Closed);
//!
//! machine.start();
//! machine.dispatch(&Push);
//! assert_eq!(machine.current(), Some(Door::Open));
//! ```
//!
//! Two execution disciplines are provided as separate engines: the blocking
//! [`StateMachine`] and the suspending [`AsyncStateMachine`], whose handlers
//! return futures that are awaited strictly in registration order. Pick one
//! per machine instance; the dispatch contract is identical.

pub mod async_machine;
pub mod core;
pub mod machine;
pub mod macros;
pub mod snapshot;

// Re-export commonly used types
pub use crate::core::{
    Guard, StateEntered, StateExited, StateToken, TransitionLog, TransitionRecord, TriggerOutcome,
};
pub use async_machine::{AsyncState, AsyncStateMachine};
pub use machine::{State, StateMachine};
pub use snapshot::{MachineSnapshot, SnapshotError};
