//! The value produced by resolving a trigger against a state.

use crate::core::token::StateToken;

/// Result of running one state's handler chain for one trigger.
///
/// Couples the token to transition to with whether the same trigger should
/// be redelivered into the new state after its enter notification. A target
/// equal to the resolving state's own token means "no transition".
///
/// Outcomes are ephemeral: produced and consumed within a single dispatch
/// step, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerOutcome<T: StateToken> {
    /// Token of the state to transition to.
    pub target: T,
    /// Whether to redeliver the trigger after an actual state change.
    pub forward: bool,
}

impl<T: StateToken> TriggerOutcome<T> {
    /// Outcome that transitions to `target`.
    pub fn new(target: T, forward: bool) -> Self {
        Self { target, forward }
    }

    /// The canonical no-transition outcome: stay on `current`, no
    /// forwarding.
    pub fn stay(current: T) -> Self {
        Self {
            target: current,
            forward: false,
        }
    }

    /// Pick the single state-changing outcome out of a resolved chain.
    ///
    /// Every entry of a chain produces an outcome; at most one of them may
    /// name a token other than `own`. More than one is a configuration bug
    /// and aborts the dispatch rather than silently picking a winner.
    pub(crate) fn settle(own: &T, outcomes: Vec<Self>) -> Self {
        let mut changes = outcomes.into_iter().filter(|o| o.target != *own);
        let first = changes.next();
        if changes.next().is_some() {
            panic!(
                "state {:?}: multiple handlers requested a state change for one trigger dispatch",
                own
            );
        }
        first.unwrap_or_else(|| Self::stay(own.clone()))
    }
}
