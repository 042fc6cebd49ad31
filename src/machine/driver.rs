//! The transition driver and dispatch loop.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::core::history::TransitionLog;
use crate::core::token::StateToken;
use crate::core::triggers::{StateEntered, StateExited};
use crate::machine::cell::DispatchCell;
use crate::machine::state::State;
use crate::snapshot::{MachineSnapshot, SnapshotError};

/// Blocking finite-state-machine engine.
///
/// A machine owns its state registry, the designated starting token, and
/// the single mutable active-state pointer. Configure states with
/// [`configure`](Self::configure), enter the starting state with
/// [`start`](Self::start), then feed trigger values to
/// [`dispatch`](Self::dispatch).
///
/// One external `dispatch`/`start`/`go_to_starting_state` call owns the
/// machine for its entire forwarding chain: concurrent calls from other
/// threads queue on an internal mutex, so handler evaluations of two
/// trigger deliveries never interleave. The lock is not re-entrant:
/// handlers must not call back into the machine they are registered on.
pub struct StateMachine<T: StateToken> {
    states: RwLock<HashMap<T, Arc<State<T>>>>,
    starting: T,
    cell: Mutex<DispatchCell<T>>,
}

impl<T: StateToken> StateMachine<T> {
    /// Create a machine that will start in `starting`.
    ///
    /// The starting token is fixed for the machine's lifetime; it does not
    /// need to be configured yet, only by the time [`start`](Self::start)
    /// runs.
    pub fn new(starting: T) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            starting,
            cell: Mutex::new(DispatchCell::new()),
        }
    }

    /// Get or create the [`State`] for `token`.
    ///
    /// Idempotent per token: reconfiguring returns the same state, with its
    /// already-registered handlers intact.
    pub fn configure(&self, token: T) -> Arc<State<T>> {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        match states.entry(token) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let state = Arc::new(State::new(entry.key().clone()));
                entry.insert(Arc::clone(&state));
                state
            }
        }
    }

    /// Enter the starting state, firing its enter notification.
    pub fn start(&self) {
        self.go_to_starting_state();
    }

    /// Go (back) to the starting state.
    ///
    /// Usable as an explicit reset. Follows the normal transition-attempt
    /// logic: a machine already in the starting state stays put with no
    /// notifications, and a machine in some other state gets the full
    /// exit/enter bracketing.
    pub fn go_to_starting_state(&self) {
        let mut cell = self.lock_cell();
        self.shift_to(&mut cell, self.starting.clone());
    }

    /// Dispatch a trigger value into the machine.
    ///
    /// A no-op before [`start`](Self::start). Otherwise the trigger is
    /// resolved against the current state; an actual transition fires the
    /// exit notification into the old state, moves the pointer, fires the
    /// enter notification into the new state, and, when the winning
    /// handler asked for forwarding, redelivers the same trigger into the
    /// new state, repeating until some state declines to transition or to
    /// forward.
    ///
    /// Panics from handler transforms (including the engine's own
    /// configuration-ambiguity panic) propagate to the caller; the engine
    /// performs no rollback of a partially applied exit/enter sequence.
    pub fn dispatch<Trig: Any>(&self, trigger: &Trig) {
        log::trace!("dispatch {}", std::any::type_name::<Trig>());
        let mut cell = self.lock_cell();
        self.dispatch_erased(&mut cell, trigger);
    }

    /// The active token, or `None` before the machine has started.
    pub fn current(&self) -> Option<T> {
        self.lock_cell().current.clone()
    }

    /// Point-in-time copy of the transition log.
    pub fn history(&self) -> TransitionLog<T> {
        self.lock_cell().log.clone()
    }

    /// Capture the machine's position and log.
    ///
    /// Handler registrations are closures and are not captured; a restored
    /// machine must be configured by the same code that configured this
    /// one.
    pub fn snapshot(&self) -> MachineSnapshot<T> {
        let cell = self.lock_cell();
        MachineSnapshot::capture(self.starting.clone(), cell.current.clone(), cell.log.clone())
    }

    /// Re-point the machine at a previously captured position.
    ///
    /// This is a resume, not a re-entry: no exit/enter notifications fire.
    /// Fails if the snapshot's format version is unsupported or its current
    /// token was never configured on this machine.
    pub fn restore(&self, snapshot: &MachineSnapshot<T>) -> Result<(), SnapshotError> {
        snapshot.check_version()?;
        if let Some(current) = &snapshot.current {
            if self.state_for(current).is_none() {
                return Err(SnapshotError::UnknownState(format!("{current:?}")));
            }
        }
        let mut cell = self.lock_cell();
        cell.current = snapshot.current.clone();
        cell.log = snapshot.log.clone();
        Ok(())
    }

    fn lock_cell(&self) -> MutexGuard<'_, DispatchCell<T>> {
        // A panicking handler poisons the lock mid-transition; consistency
        // after that is the caller's concern, the machine itself stays
        // usable.
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_for(&self, token: &T) -> Option<Arc<State<T>>> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.get(token).cloned()
    }

    /// The dispatch algorithm over the locked cell.
    ///
    /// Forwarding is the loop; exit/enter notifications recurse through
    /// here as plain calls on the same `&mut` cell, so the dispatch mutex
    /// is acquired exactly once per external call.
    fn dispatch_erased(&self, cell: &mut DispatchCell<T>, trigger: &dyn Any) {
        loop {
            let Some(current) = cell.current.clone() else {
                return;
            };
            let Some(state) = self.state_for(&current) else {
                return;
            };
            let outcome = state.resolve(trigger);
            if !(self.shift_to(cell, outcome.target) && outcome.forward) {
                return;
            }
            // Transitioned with forwarding requested: redeliver the same
            // trigger against the state just entered.
        }
    }

    /// Attempt a transition to `target`; reports whether one occurred.
    fn shift_to(&self, cell: &mut DispatchCell<T>, target: T) -> bool {
        if cell.current.as_ref() == Some(&target) {
            return false;
        }
        if self.state_for(&target).is_none() {
            log::warn!("transition to unconfigured state {:?} ignored", target);
            return false;
        }
        if cell.current.is_some() {
            // Exit handlers run the full dispatch algorithm and may
            // themselves transition; `target` still wins the pointer below.
            self.dispatch_erased(cell, &StateExited);
        }
        cell.shift(target);
        self.dispatch_erased(cell, &StateEntered);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Phase {
        Idle,
        Running,
        Done,
    }

    struct Go;
    struct Finish;
    struct Nudge;

    fn event_sink() -> (Arc<StdMutex<Vec<String>>>, impl Fn(&str) + Clone) {
        let sink = Arc::new(StdMutex::new(Vec::new()));
        let push = {
            let sink = Arc::clone(&sink);
            move |label: &str| sink.lock().unwrap().push(label.to_string())
        };
        (sink, push)
    }

    #[test]
    fn dispatch_before_start_is_a_no_op() {
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle).transition_to::<Go>(Phase::Running);
        machine.configure(Phase::Running);

        machine.dispatch(&Go);
        assert_eq!(machine.current(), None);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn start_enters_the_starting_state() {
        let (sink, push) = event_sink();
        let machine = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle)
            .act(move |_: &StateEntered| push("entered idle"));

        machine.start();
        assert_eq!(machine.current(), Some(Phase::Idle));
        assert_eq!(*sink.lock().unwrap(), vec!["entered idle"]);
        assert_eq!(machine.history().path(), vec![&Phase::Idle]);
    }

    #[test]
    fn start_without_a_configured_starting_state_stays_unstarted() {
        let machine: StateMachine<Phase> = StateMachine::new(Phase::Idle);
        machine.start();
        assert_eq!(machine.current(), None);
    }

    #[test]
    fn configure_is_idempotent_per_token() {
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle).transition_to::<Go>(Phase::Running);
        machine.configure(Phase::Running);

        // Second configure returns the same state; the handler survives.
        machine.configure(Phase::Idle);
        machine.start();
        machine.dispatch(&Go);
        assert_eq!(machine.current(), Some(Phase::Running));
    }

    #[test]
    fn exit_then_pointer_then_enter_ordering() {
        let (sink, push) = event_sink();
        let machine = StateMachine::new(Phase::Idle);

        let p = push.clone();
        machine
            .configure(Phase::Idle)
            .transition_to::<Go>(Phase::Running)
            .act(move |_: &StateExited| p("exit idle"));
        let p = push.clone();
        machine
            .configure(Phase::Running)
            .act(move |_: &StateEntered| p("enter running"));

        machine.start();
        machine.dispatch(&Go);

        assert_eq!(*sink.lock().unwrap(), vec!["exit idle", "enter running"]);
        assert_eq!(
            machine.history().path(),
            vec![&Phase::Idle, &Phase::Running]
        );
    }

    #[test]
    fn forwarding_redelivers_exactly_once() {
        let deliveries = Arc::new(AtomicUsize::new(0));
        let machine = StateMachine::new(Phase::Idle);

        machine.configure(Phase::Idle).transition_to::<Go>(Phase::Running);
        let seen = Arc::clone(&deliveries);
        machine.configure(Phase::Running).act(move |_: &Go| {
            seen.fetch_add(1, Ordering::Relaxed);
        });

        machine.start();
        machine.dispatch(&Go);

        assert_eq!(deliveries.load(Ordering::Relaxed), 1);
        assert_eq!(machine.current(), Some(Phase::Running));
    }

    #[test]
    fn forward_false_suppresses_redelivery() {
        let deliveries = Arc::new(AtomicUsize::new(0));
        let machine = StateMachine::new(Phase::Idle);

        machine
            .configure(Phase::Idle)
            .on_trigger(None, |_: &Go| Phase::Running, false);
        let seen = Arc::clone(&deliveries);
        machine.configure(Phase::Running).act(move |_: &Go| {
            seen.fetch_add(1, Ordering::Relaxed);
        });

        machine.start();
        machine.dispatch(&Go);

        assert_eq!(machine.current(), Some(Phase::Running));
        assert_eq!(deliveries.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn forwarding_chains_until_a_state_declines() {
        // Idle -> Running -> Done off one Nudge, via forwarding.
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle).transition_to::<Nudge>(Phase::Running);
        machine.configure(Phase::Running).transition_to::<Nudge>(Phase::Done);
        machine.configure(Phase::Done);

        machine.start();
        machine.dispatch(&Nudge);

        assert_eq!(machine.current(), Some(Phase::Done));
        assert_eq!(
            machine.history().path(),
            vec![&Phase::Idle, &Phase::Running, &Phase::Done]
        );
    }

    #[test]
    fn unconfigured_target_is_ignored() {
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle).transition_to::<Go>(Phase::Running);

        machine.start();
        machine.dispatch(&Go);

        assert_eq!(machine.current(), Some(Phase::Idle));
    }

    #[test]
    fn unknown_trigger_kind_is_ignored() {
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle);

        machine.start();
        machine.dispatch(&Finish);

        assert_eq!(machine.current(), Some(Phase::Idle));
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn reset_from_elsewhere_brackets_with_notifications() {
        let (sink, push) = event_sink();
        let machine = StateMachine::new(Phase::Idle);

        let p = push.clone();
        machine
            .configure(Phase::Idle)
            .transition_to::<Go>(Phase::Running)
            .act(move |_: &StateEntered| p("enter idle"));
        let p = push.clone();
        machine
            .configure(Phase::Running)
            .act(move |_: &StateExited| p("exit running"));

        machine.start();
        machine.dispatch(&Go);
        machine.go_to_starting_state();

        assert_eq!(
            *sink.lock().unwrap(),
            vec!["enter idle", "exit running", "enter idle"]
        );
        assert_eq!(machine.current(), Some(Phase::Idle));
    }

    #[test]
    fn reset_in_starting_state_is_idempotent() {
        let notifications = Arc::new(AtomicUsize::new(0));
        let machine = StateMachine::new(Phase::Idle);
        let seen = Arc::clone(&notifications);
        machine.configure(Phase::Idle).act(move |_: &StateEntered| {
            seen.fetch_add(1, Ordering::Relaxed);
        });

        machine.start();
        machine.go_to_starting_state();
        machine.go_to_starting_state();

        assert_eq!(notifications.load(Ordering::Relaxed), 1);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn exit_handler_side_effects_run_but_target_wins() {
        let (sink, push) = event_sink();
        let machine = StateMachine::new(Phase::Idle);

        let p = push.clone();
        machine
            .configure(Phase::Idle)
            .transition_to::<Go>(Phase::Running)
            .act(move |_: &StateExited| p("leaving idle"));
        machine.configure(Phase::Running).transition_to::<Finish>(Phase::Done);
        machine.configure(Phase::Done);

        machine.start();
        machine.dispatch(&Go);
        machine.dispatch(&Finish);

        assert_eq!(machine.current(), Some(Phase::Done));
        assert_eq!(*sink.lock().unwrap(), vec!["leaving idle"]);
    }

    #[test]
    fn snapshot_and_restore_round_trip() {
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle).transition_to::<Go>(Phase::Running);
        machine.configure(Phase::Running);

        machine.start();
        machine.dispatch(&Go);
        let snapshot = machine.snapshot();

        machine.go_to_starting_state();
        assert_eq!(machine.current(), Some(Phase::Idle));

        machine.restore(&snapshot).unwrap();
        assert_eq!(machine.current(), Some(Phase::Running));
        assert_eq!(machine.history().len(), snapshot.log.len());
    }

    #[test]
    fn restore_rejects_unconfigured_current_state() {
        let source = StateMachine::new(Phase::Idle);
        source.configure(Phase::Idle).transition_to::<Go>(Phase::Running);
        source.configure(Phase::Running);
        source.start();
        source.dispatch(&Go);
        let snapshot = source.snapshot();

        let sparse: StateMachine<Phase> = StateMachine::new(Phase::Idle);
        sparse.configure(Phase::Idle);

        let result = sparse.restore(&snapshot);
        assert!(matches!(result, Err(SnapshotError::UnknownState(_))));
        assert_eq!(sparse.current(), None);
    }

    #[test]
    fn restore_does_not_fire_notifications() {
        let notifications = Arc::new(AtomicUsize::new(0));
        let machine = StateMachine::new(Phase::Idle);
        machine.configure(Phase::Idle).transition_to::<Go>(Phase::Running);
        let seen = Arc::clone(&notifications);
        machine.configure(Phase::Running).act(move |_: &StateEntered| {
            seen.fetch_add(1, Ordering::Relaxed);
        });

        machine.start();
        machine.dispatch(&Go);
        assert_eq!(notifications.load(Ordering::Relaxed), 1);

        let snapshot = machine.snapshot();
        machine.go_to_starting_state();
        machine.restore(&snapshot).unwrap();

        assert_eq!(machine.current(), Some(Phase::Running));
        assert_eq!(notifications.load(Ordering::Relaxed), 1);
    }
}
