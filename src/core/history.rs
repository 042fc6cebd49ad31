//! Transition records and the append-only log.
//!
//! Every transition a machine applies, including those caused by the
//! built-in enter/exit notifications and by forwarding, is recorded here
//! with a timestamp. The log is owned by the machine and appended under its
//! dispatch lock; callers get point-in-time copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::token::StateToken;

/// Record of a single applied transition.
///
/// `from` is `None` for the entry a machine makes into its starting state,
/// where there is no prior state to leave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<T: StateToken> {
    /// The state left, if any.
    pub from: Option<T>,
    /// The state entered.
    pub to: T,
    /// When the active pointer moved.
    pub at: DateTime<Utc>,
}

/// Ordered log of applied transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLog<T: StateToken> {
    records: Vec<TransitionRecord<T>>,
}

impl<T: StateToken> Default for TransitionLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StateToken> TransitionLog<T> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record.
    pub fn record(&mut self, record: TransitionRecord<T>) {
        self.records.push(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[TransitionRecord<T>] {
        &self.records
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&TransitionRecord<T>> {
        self.records.last()
    }

    /// Number of recorded transitions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether anything has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The sequence of states occupied, in order.
    ///
    /// Starts with the first record's `from` when one exists (a log that
    /// begins with `start()` begins directly at the starting state).
    pub fn path(&self) -> Vec<&T> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.first() {
            if let Some(from) = &first.from {
                path.push(from);
            }
        }
        for record in &self.records {
            path.push(&record.to);
        }
        path
    }

    /// Wall-clock span between the first and last record.
    pub fn duration(&self) -> Option<Duration> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => {
                last.at.signed_duration_since(first.at).to_std().ok()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum Step {
        Start,
        Middle,
        End,
    }

    fn record(from: Option<Step>, to: Step) -> TransitionRecord<Step> {
        TransitionRecord {
            from,
            to,
            at: Utc::now(),
        }
    }

    #[test]
    fn new_log_is_empty() {
        let log: TransitionLog<Step> = TransitionLog::new();
        assert!(log.is_empty());
        assert!(log.path().is_empty());
        assert!(log.duration().is_none());
    }

    #[test]
    fn records_keep_insertion_order() {
        let mut log = TransitionLog::new();
        log.record(record(None, Step::Start));
        log.record(record(Some(Step::Start), Step::Middle));
        log.record(record(Some(Step::Middle), Step::End));

        assert_eq!(log.len(), 3);
        assert_eq!(log.records()[1].to, Step::Middle);
        assert_eq!(log.last().map(|r| r.to), Some(Step::End));
    }

    #[test]
    fn path_starts_at_the_starting_state() {
        let mut log = TransitionLog::new();
        log.record(record(None, Step::Start));
        log.record(record(Some(Step::Start), Step::Middle));

        assert_eq!(log.path(), vec![&Step::Start, &Step::Middle]);
    }

    #[test]
    fn path_includes_a_leading_from_state() {
        // A log restored mid-run may begin with a record that has a `from`.
        let mut log = TransitionLog::new();
        log.record(record(Some(Step::Start), Step::Middle));
        log.record(record(Some(Step::Middle), Step::End));

        assert_eq!(log.path(), vec![&Step::Start, &Step::Middle, &Step::End]);
    }

    #[test]
    fn duration_spans_first_to_last() {
        let base = Utc::now();
        let mut log = TransitionLog::new();
        log.record(TransitionRecord {
            from: None,
            to: Step::Start,
            at: base,
        });
        log.record(TransitionRecord {
            from: Some(Step::Start),
            to: Step::End,
            at: base + chrono::Duration::milliseconds(25),
        });

        assert_eq!(log.duration(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn log_round_trips_through_json() {
        let mut log = TransitionLog::new();
        log.record(record(None, Step::Start));
        log.record(record(Some(Step::Start), Step::End));

        let json = serde_json::to_string(&log).unwrap();
        let back: TransitionLog<Step> = serde_json::from_str(&json).unwrap();
        assert_eq!(log, back);
    }
}
