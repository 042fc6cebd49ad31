//! The suspending dispatch engine.
//!
//! Same contract as the blocking engine, but handler transforms return
//! futures (awaiting external work mid-transform is fine) and the dispatch
//! lock is an async mutex held across those awaits. Within one resolution
//! step the chain is awaited strictly in registration order; handlers are
//! never evaluated concurrently, which is what keeps the single-change
//! check deterministic.

mod driver;
mod state;

pub use driver::AsyncStateMachine;
pub use state::AsyncState;

/// Erased trigger type of the suspending engine.
///
/// Handler futures cross await points, so triggers must be `Send + Sync`
/// on top of `Any`.
pub(crate) type AnyTrigger = dyn std::any::Any + Send + Sync;
