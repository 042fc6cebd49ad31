//! Per-state trigger registration and resolution.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::guard::Guard;
use crate::core::outcome::TriggerOutcome;
use crate::core::token::StateToken;

/// Type-erased handler entry: downcasts the trigger, checks its guard, and
/// produces an outcome.
type HandlerFn<T> = Arc<dyn Fn(&dyn Any) -> TriggerOutcome<T> + Send + Sync>;

/// One configured state: a token plus the handler chains for each trigger
/// kind it reacts to.
///
/// States know nothing about each other or about the machine; resolving a
/// trigger only consults this state's own chains. Handles are shared
/// (`Arc`) so [`StateMachine::configure`](crate::StateMachine::configure)
/// can hand out the same state for fluent chained registration:
///
/// ```rust
/// use trigfsm::StateMachine;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Lamp {
///     Off,
///     On,
/// }
///
/// struct Toggle;
/// struct Report;
///
/// let machine = StateMachine::new(Lamp::Off);
/// machine
///     .configure(Lamp::Off)
///     .transition_to::<Toggle>(Lamp::On)
///     .act(|_: &Report| println!("still off"));
/// ```
pub struct State<T: StateToken> {
    token: T,
    chains: RwLock<HashMap<TypeId, Vec<HandlerFn<T>>>>,
}

impl<T: StateToken> State<T> {
    pub(crate) fn new(token: T) -> Self {
        Self {
            token,
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// The token identifying this state.
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Registration primitive behind the convenience methods.
    ///
    /// Appends one handler to the chain for `Trig`. At dispatch time the
    /// guard (if any) is evaluated first; a failing guard contributes the
    /// stay outcome for this entry. Otherwise `transform` runs with the
    /// trigger payload and its token is paired with `forward`.
    ///
    /// Multiple registrations for the same kind are legal and evaluated in
    /// registration order, but at most one of them may produce an actual
    /// state change per dispatch.
    pub fn on_trigger<Trig, F>(&self, guard: Option<Guard>, transform: F, forward: bool) -> &Self
    where
        Trig: Any,
        F: Fn(&Trig) -> T + Send + Sync + 'static,
    {
        let own = self.token.clone();
        let entry: HandlerFn<T> = Arc::new(move |raw| {
            if let Some(guard) = &guard {
                if !guard.check() {
                    return TriggerOutcome::stay(own.clone());
                }
            }
            let trigger = raw
                .downcast_ref::<Trig>()
                .expect("handler chain key and trigger kind diverged");
            TriggerOutcome::new(transform(trigger), forward)
        });

        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        chains.entry(TypeId::of::<Trig>()).or_default().push(entry);
        drop(chains);
        self
    }

    /// React to `Trig` by computing the target token from the payload.
    pub fn on<Trig, F>(&self, transform: F) -> &Self
    where
        Trig: Any,
        F: Fn(&Trig) -> T + Send + Sync + 'static,
    {
        self.on_trigger(None, transform, true)
    }

    /// Guarded variant of [`on`](Self::on).
    pub fn on_if<Trig, P, F>(&self, guard: P, transform: F) -> &Self
    where
        Trig: Any,
        P: Fn() -> bool + Send + Sync + 'static,
        F: Fn(&Trig) -> T + Send + Sync + 'static,
    {
        self.on_trigger(Some(Guard::new(guard)), transform, true)
    }

    /// React to `Trig` with a side effect only; the state does not change.
    pub fn act<Trig, F>(&self, action: F) -> &Self
    where
        Trig: Any,
        F: Fn(&Trig) + Send + Sync + 'static,
    {
        let own = self.token.clone();
        self.on_trigger(
            None,
            move |trigger: &Trig| {
                action(trigger);
                own.clone()
            },
            true,
        )
    }

    /// Guarded variant of [`act`](Self::act).
    pub fn act_if<Trig, P, F>(&self, guard: P, action: F) -> &Self
    where
        Trig: Any,
        P: Fn() -> bool + Send + Sync + 'static,
        F: Fn(&Trig) + Send + Sync + 'static,
    {
        let own = self.token.clone();
        self.on_trigger(
            Some(Guard::new(guard)),
            move |trigger: &Trig| {
                action(trigger);
                own.clone()
            },
            true,
        )
    }

    /// React to `Trig` by transitioning to a fixed target.
    pub fn transition_to<Trig>(&self, target: T) -> &Self
    where
        Trig: Any,
    {
        self.on_trigger(None, move |_: &Trig| target.clone(), true)
    }

    /// Guarded variant of [`transition_to`](Self::transition_to).
    pub fn transition_to_if<Trig, P>(&self, guard: P, target: T) -> &Self
    where
        Trig: Any,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.on_trigger(Some(Guard::new(guard)), move |_: &Trig| target.clone(), true)
    }

    /// Resolve a trigger value against this state's chains.
    ///
    /// With no chain registered for the trigger's kind this is the stay
    /// outcome. Otherwise every entry runs (side-effecting handlers later
    /// in the chain still fire even when an earlier entry produced a state
    /// change) and the single change, if any, wins.
    ///
    /// # Panics
    ///
    /// When more than one entry produces a state change for this dispatch;
    /// that is a configuration bug, not a runtime condition.
    pub fn resolve(&self, trigger: &dyn Any) -> TriggerOutcome<T> {
        let chain = {
            let chains = self.chains.read().unwrap_or_else(PoisonError::into_inner);
            chains.get(&trigger.type_id()).cloned()
        };
        let Some(chain) = chain else {
            return TriggerOutcome::stay(self.token.clone());
        };

        let outcomes: Vec<_> = chain.iter().map(|entry| entry(trigger)).collect();
        TriggerOutcome::settle(&self.token, outcomes)
    }
}

impl<T: StateToken> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl<T: StateToken> Eq for State<T> {}

impl<T: StateToken> Hash for State<T> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.token.hash(hasher);
    }
}

impl<T: StateToken> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("token", &self.token).finish_non_exhaustive()
    }
}
