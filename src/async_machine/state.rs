//! Per-state trigger registration and resolution, suspending flavor.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::{ready, BoxFuture};
use futures::FutureExt;

use crate::async_machine::AnyTrigger;
use crate::core::guard::Guard;
use crate::core::outcome::TriggerOutcome;
use crate::core::token::StateToken;

type AsyncHandlerFn<T> =
    Arc<dyn for<'a> Fn(&'a AnyTrigger) -> BoxFuture<'a, TriggerOutcome<T>> + Send + Sync>;

/// One configured state of an [`AsyncStateMachine`](crate::AsyncStateMachine).
///
/// The registration surface mirrors the blocking [`State`](crate::State),
/// except transforms and actions return [`BoxFuture`]s:
///
/// ```rust
/// use futures::FutureExt;
/// use trigfsm::AsyncStateMachine;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Job {
///     Queued,
///     Uploading,
/// }
///
/// struct Upload {
///     bytes: usize,
/// }
///
/// # let _ = || {
/// let machine = AsyncStateMachine::new(Job::Queued);
/// machine.configure(Job::Queued).on(|upload: &Upload| {
///     let bytes = upload.bytes;
///     async move {
///         // await the actual transfer here
///         let _ = bytes;
///         Job::Uploading
///     }
///     .boxed()
/// });
/// # };
/// ```
pub struct AsyncState<T: StateToken> {
    token: T,
    chains: RwLock<HashMap<TypeId, Vec<AsyncHandlerFn<T>>>>,
}

impl<T: StateToken> AsyncState<T> {
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
    /// The guard (if any) is checked synchronously before the transform's
    /// future is even constructed; a failing guard contributes the stay
    /// outcome for this entry.
    pub fn on_trigger<Trig, F>(&self, guard: Option<Guard>, transform: F, forward: bool) -> &Self
    where
        Trig: Any + Send + Sync,
        F: for<'a> Fn(&'a Trig) -> BoxFuture<'a, T> + Send + Sync + 'static,
    {
        let own = self.token.clone();
        let entry: AsyncHandlerFn<T> = Arc::new(move |raw: &AnyTrigger| {
            if let Some(guard) = &guard {
                if !guard.check() {
                    return ready(TriggerOutcome::stay(own.clone())).boxed();
                }
            }
            let trigger = raw
                .downcast_ref::<Trig>()
                .expect("handler chain key and trigger kind diverged");
            let target = transform(trigger);
            async move { TriggerOutcome::new(target.await, forward) }.boxed()
        });

        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        chains.entry(TypeId::of::<Trig>()).or_default().push(entry);
        drop(chains);
        self
    }

    /// React to `Trig` by computing the target token from the payload.
    pub fn on<Trig, F>(&self, transform: F) -> &Self
    where
        Trig: Any + Send + Sync,
        F: for<'a> Fn(&'a Trig) -> BoxFuture<'a, T> + Send + Sync + 'static,
    {
        self.on_trigger(None, transform, true)
    }

    /// Guarded variant of [`on`](Self::on).
    pub fn on_if<Trig, P, F>(&self, guard: P, transform: F) -> &Self
    where
        Trig: Any + Send + Sync,
        P: Fn() -> bool + Send + Sync + 'static,
        F: for<'a> Fn(&'a Trig) -> BoxFuture<'a, T> + Send + Sync + 'static,
    {
        self.on_trigger(Some(Guard::new(guard)), transform, true)
    }

    /// React to `Trig` with a side effect only; the state does not change.
    pub fn act<Trig, F>(&self, action: F) -> &Self
    where
        Trig: Any + Send + Sync,
        F: for<'a> Fn(&'a Trig) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        let own = self.token.clone();
        self.on_trigger(
            None,
            move |trigger: &Trig| {
                let own = own.clone();
                let effect = action(trigger);
                async move {
                    effect.await;
                    own
                }
                .boxed()
            },
            true,
        )
    }

    /// Guarded variant of [`act`](Self::act).
    pub fn act_if<Trig, P, F>(&self, guard: P, action: F) -> &Self
    where
        Trig: Any + Send + Sync,
        P: Fn() -> bool + Send + Sync + 'static,
        F: for<'a> Fn(&'a Trig) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        let own = self.token.clone();
        self.on_trigger(
            Some(Guard::new(guard)),
            move |trigger: &Trig| {
                let own = own.clone();
                let effect = action(trigger);
                async move {
                    effect.await;
                    own
                }
                .boxed()
            },
            true,
        )
    }

    /// React to `Trig` by transitioning to a fixed target.
    pub fn transition_to<Trig>(&self, target: T) -> &Self
    where
        Trig: Any + Send + Sync,
    {
        self.on_trigger(
            None,
            move |_: &Trig| ready(target.clone()).boxed(),
            true,
        )
    }

    /// Guarded variant of [`transition_to`](Self::transition_to).
    pub fn transition_to_if<Trig, P>(&self, guard: P, target: T) -> &Self
    where
        Trig: Any + Send + Sync,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.on_trigger(
            Some(Guard::new(guard)),
            move |_: &Trig| ready(target.clone()).boxed(),
            true,
        )
    }

    /// Resolve a trigger value against this state's chains.
    ///
    /// Entries are awaited one at a time, in registration order; a fully
    /// serial view of the chain is what makes the single-change check
    /// sound.
    ///
    /// # Panics
    ///
    /// When more than one entry produces a state change for this dispatch.
    pub async fn resolve(&self, trigger: &AnyTrigger) -> TriggerOutcome<T> {
        let chain = {
            let chains = self.chains.read().unwrap_or_else(PoisonError::into_inner);
            chains.get(&trigger.type_id()).cloned()
        };
        let Some(chain) = chain else {
            return TriggerOutcome::stay(self.token.clone());
        };

        let mut outcomes = Vec::with_capacity(chain.len());
        for entry in &chain {
            outcomes.push(entry(trigger).await);
        }
        TriggerOutcome::settle(&self.token, outcomes)
    }
}

impl<T: StateToken> PartialEq for AsyncState<T> {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl<T: StateToken> Eq for AsyncState<T> {}

impl<T: StateToken> Hash for AsyncState<T> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.token.hash(hasher);
    }
}

impl<T: StateToken> fmt::Debug for AsyncState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncState")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Token {
        Here,
        There,
        Elsewhere,
    }

    struct Ping;
    struct Pong(u32);

    #[tokio::test]
    async fn unregistered_kind_resolves_to_stay() {
        let state = AsyncState::new(Token::Here);
        assert_eq!(state.resolve(&Ping).await, TriggerOutcome::stay(Token::Here));
    }

    #[tokio::test]
    async fn payload_reaches_the_transform() {
        let state = AsyncState::new(Token::Here);
        state.on(|trigger: &Pong| {
            let value = trigger.0;
            async move {
                if value > 10 {
                    Token::There
                } else {
                    Token::Here
                }
            }
            .boxed()
        });

        assert_eq!(state.resolve(&Pong(3)).await.target, Token::Here);
        assert_eq!(state.resolve(&Pong(30)).await.target, Token::There);
    }

    #[tokio::test]
    async fn handlers_are_awaited_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let state = AsyncState::new(Token::Here);

        let seen = Arc::clone(&order);
        state.act(move |_: &Ping| {
            let seen = Arc::clone(&seen);
            async move {
                // Yield first: were the chain evaluated concurrently, the
                // second handler would slip in ahead.
                tokio::task::yield_now().await;
                seen.lock().unwrap().push(1);
            }
            .boxed()
        });
        let seen = Arc::clone(&order);
        state.act(move |_: &Ping| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(2);
            }
            .boxed()
        });

        state.resolve(&Ping).await;
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn guard_is_checked_before_the_future_is_built() {
        let open = Arc::new(AtomicBool::new(false));
        let built = Arc::new(AtomicBool::new(false));
        let state = AsyncState::new(Token::Here);

        let flag = Arc::clone(&open);
        let witness = Arc::clone(&built);
        state.on_if(
            move || flag.load(Ordering::Relaxed),
            move |_: &Ping| {
                witness.store(true, Ordering::Relaxed);
                ready(Token::There).boxed()
            },
        );

        assert_eq!(state.resolve(&Ping).await.target, Token::Here);
        assert!(!built.load(Ordering::Relaxed));

        open.store(true, Ordering::Relaxed);
        assert_eq!(state.resolve(&Ping).await.target, Token::There);
        assert!(built.load(Ordering::Relaxed));
    }

    #[tokio::test]
    #[should_panic(expected = "multiple handlers requested a state change")]
    async fn competing_changes_fail_fast() {
        let state = AsyncState::new(Token::Here);
        state.transition_to::<Ping>(Token::There);
        state.transition_to::<Ping>(Token::Elsewhere);

        state.resolve(&Ping).await;
    }

    #[tokio::test]
    async fn forward_flag_is_carried_through() {
        let state = AsyncState::new(Token::Here);
        state.on_trigger(
            None,
            |_: &Ping| ready(Token::There).boxed(),
            false,
        );

        let outcome = state.resolve(&Ping).await;
        assert_eq!(outcome.target, Token::There);
        assert!(!outcome.forward);
    }
}
