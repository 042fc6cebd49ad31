//! Opaque state identifiers.

use std::fmt::Debug;
use std::hash::Hash;

/// Marker trait for state tokens.
///
/// A token uniquely identifies one configured state. The engine uses tokens
/// as map keys and as the sentinel for "no transition" (a handler returning
/// the current token), so equality and hashing must be total and stable for
/// the lifetime of the machine.
///
/// The trait is blanket-implemented: any `Clone + Eq + Hash + Debug` type
/// that is thread-safe qualifies, so a plain derived enum is enough.
///
/// # Example
///
/// ```rust
/// use trigfsm::StateToken;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Phase {
///     Idle,
///     Busy,
/// }
///
/// fn assert_token<T: StateToken>() {}
/// assert_token::<Phase>();
/// ```
pub trait StateToken: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> StateToken for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
