//! The transition driver and dispatch loop, suspending flavor.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Mutex;

use crate::async_machine::state::AsyncState;
use crate::async_machine::AnyTrigger;
use crate::core::history::TransitionLog;
use crate::core::token::StateToken;
use crate::core::triggers::{StateEntered, StateExited};
use crate::machine::cell::DispatchCell;
use crate::snapshot::{MachineSnapshot, SnapshotError};

/// Suspending finite-state-machine engine.
///
/// The async counterpart of [`StateMachine`](crate::StateMachine): handler
/// transforms may await external work before producing their token. One
/// external `dispatch`/`start`/`go_to_starting_state` call owns the machine
/// for its entire forwarding chain; concurrent callers queue on an async
/// mutex that is held across handler awaits. The lock is not re-entrant:
/// handlers must not call back into the machine they are registered on.
pub struct AsyncStateMachine<T: StateToken> {
    states: RwLock<HashMap<T, Arc<AsyncState<T>>>>,
    starting: T,
    cell: Mutex<DispatchCell<T>>,
}

impl<T: StateToken> AsyncStateMachine<T> {
    /// Create a machine that will start in `starting`.
    pub fn new(starting: T) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            starting,
            cell: Mutex::new(DispatchCell::new()),
        }
    }

    /// Get or create the [`AsyncState`] for `token`. Idempotent per token.
    pub fn configure(&self, token: T) -> Arc<AsyncState<T>> {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        match states.entry(token) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let state = Arc::new(AsyncState::new(entry.key().clone()));
                entry.insert(Arc::clone(&state));
                state
            }
        }
    }

    /// Enter the starting state, firing its enter notification.
    pub async fn start(&self) {
        self.go_to_starting_state().await;
    }

    /// Go (back) to the starting state; a no-op when already there.
    pub async fn go_to_starting_state(&self) {
        let mut cell = self.cell.lock().await;
        self.shift_to(&mut cell, self.starting.clone()).await;
    }

    /// Dispatch a trigger value into the machine.
    ///
    /// Same algorithm as the blocking engine's
    /// [`dispatch`](crate::StateMachine::dispatch), with every handler
    /// future awaited in registration order.
    pub async fn dispatch<Trig: Any + Send + Sync>(&self, trigger: &Trig) {
        log::trace!("dispatch {}", std::any::type_name::<Trig>());
        let mut cell = self.cell.lock().await;
        self.dispatch_erased(&mut cell, trigger).await;
    }

    /// The active token, or `None` before the machine has started.
    pub async fn current(&self) -> Option<T> {
        self.cell.lock().await.current.clone()
    }

    /// Point-in-time copy of the transition log.
    pub async fn history(&self) -> TransitionLog<T> {
        self.cell.lock().await.log.clone()
    }

    /// Capture the machine's position and log.
    pub async fn snapshot(&self) -> MachineSnapshot<T> {
        let cell = self.cell.lock().await;
        MachineSnapshot::capture(self.starting.clone(), cell.current.clone(), cell.log.clone())
    }

    /// Re-point the machine at a previously captured position without
    /// firing notifications.
    pub async fn restore(&self, snapshot: &MachineSnapshot<T>) -> Result<(), SnapshotError> {
        snapshot.check_version()?;
        if let Some(current) = &snapshot.current {
            if self.state_for(current).is_none() {
                return Err(SnapshotError::UnknownState(format!("{current:?}")));
            }
        }
        let mut cell = self.cell.lock().await;
        cell.current = snapshot.current.clone();
        cell.log = snapshot.log.clone();
        Ok(())
    }

    fn state_for(&self, token: &T) -> Option<Arc<AsyncState<T>>> {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        states.get(token).cloned()
    }

    /// The dispatch algorithm over the locked cell.
    ///
    /// Mutually recursive with [`shift_to`](Self::shift_to) for the
    /// exit/enter notifications, hence the boxing; forwarding is the loop.
    /// The async mutex is acquired exactly once per external call.
    fn dispatch_erased<'a>(
        &'a self,
        cell: &'a mut DispatchCell<T>,
        trigger: &'a AnyTrigger,
    ) -> BoxFuture<'a, ()> {
        async move {
            loop {
                let Some(current) = cell.current.clone() else {
                    return;
                };
                let Some(state) = self.state_for(&current) else {
                    return;
                };
                let outcome = state.resolve(trigger).await;
                if !(self.shift_to(&mut *cell, outcome.target).await && outcome.forward) {
                    return;
                }
                // Transitioned with forwarding requested: redeliver the
                // same trigger against the state just entered.
            }
        }
        .boxed()
    }

    /// Attempt a transition to `target`; reports whether one occurred.
    fn shift_to<'a>(&'a self, cell: &'a mut DispatchCell<T>, target: T) -> BoxFuture<'a, bool> {
        async move {
            if cell.current.as_ref() == Some(&target) {
                return false;
            }
            if self.state_for(&target).is_none() {
                log::warn!("transition to unconfigured state {:?} ignored", target);
                return false;
            }
            if cell.current.is_some() {
                self.dispatch_erased(&mut *cell, &StateExited).await;
            }
            cell.shift(target);
            self.dispatch_erased(&mut *cell, &StateEntered).await;
            true
        }
        .boxed()
    }
}
