//! Guard predicates for gating handlers.
//!
//! Guards decide, at dispatch time, whether a handler's transform runs at
//! all. They are nullary: a guard reads whatever caller state its closure
//! captured, not the trigger or the token.

/// Dispatch-time predicate attached to a handler.
///
/// The predicate is re-evaluated on every dispatch of the handler's trigger
/// kind; nothing is cached from registration time or from a prior dispatch,
/// so a guard over mutable caller state changes the outcome between two
/// dispatches of the same trigger value.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use trigfsm::Guard;
///
/// let armed = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&armed);
/// let guard = Guard::new(move || flag.load(Ordering::Relaxed));
///
/// assert!(!guard.check());
/// armed.store(true, Ordering::Relaxed);
/// assert!(guard.check());
/// ```
pub struct Guard {
    predicate: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a predicate closure.
    ///
    /// The predicate must be thread-safe (`Send + Sync`); the engines may
    /// evaluate it from whichever thread or task owns the dispatch lock.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Evaluate the predicate.
    pub fn check(&self) -> bool {
        (self.predicate)()
    }
}
