//! Shared dispatch bookkeeping for the two engines.

use chrono::Utc;

use crate::core::history::{TransitionLog, TransitionRecord};
use crate::core::token::StateToken;

/// The mutable heart of a machine: the active-token pointer and the log.
///
/// Exactly one dispatch at a time owns a cell, via the engine's dispatch
/// mutex; everything recursive inside a dispatch works on `&mut` to it
/// instead of re-acquiring any lock.
pub(crate) struct DispatchCell<T: StateToken> {
    pub(crate) current: Option<T>,
    pub(crate) log: TransitionLog<T>,
}

impl<T: StateToken> DispatchCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            current: None,
            log: TransitionLog::new(),
        }
    }

    /// Re-point the cell at `target` and record the move.
    pub(crate) fn shift(&mut self, target: T) {
        let from = self.current.replace(target.clone());
        log::debug!("state -> {:?}", target);
        self.log.record(TransitionRecord {
            from,
            to: target,
            at: Utc::now(),
        });
    }
}
