#![forbid(unsafe_code)]

//! Multi-shot event stream with composable combinators.
//!
//! # Design
//!
//! [`Observable<T>`] is a cloneable handle to shared state: an ordered list
//! of subscriber callbacks behind a mutex. [`Observable::emit`] publishes one
//! value (possibly absent) to every current subscriber. Combinators such as
//! [`map`](Observable::map) or [`skip`](Observable::skip) create a fresh
//! downstream observable and register an ingestion callback upstream that
//! feeds it, so a pipeline is a DAG of observables wired by callbacks.
//!
//! ```text
//! source.emit(v) ──► [cb: map] ──► mapped.emit(f(v)) ──► [cb: select] ──► ...
//!               └──► [cb: tap] (user code)
//! ```
//!
//! Emissions are shared as `Arc<Option<T>>`, so forwarding combinators
//! (`select`, `skip`, `present`, `default_value`) never clone payloads.
//!
//! # Ownership
//!
//! The upstream observable owns each downstream's ingestion callback, and
//! through it the downstream handle. A pipeline therefore lives as long as
//! its root. Use [`Observable::subscribe`] instead of [`Observable::tap`]
//! when a subscriber must be detachable.
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in registration order.
//! 2. With [`ReplayPolicy::Off`] a subscriber never sees emissions that
//!    happened before it attached.
//! 3. With [`ReplayPolicy::Latest`] a new subscriber is first called with the
//!    most recent emission (if any), then sees every later one.
//! 4. "Nothing emitted yet" and "emitted an absent value" are distinct:
//!    `emit(None)` is a real emission.
//! 5. No lock is held while callbacks run; `emit` and `subscribe` may be
//!    called re-entrantly from inside a callback.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Inner promise of `then` rejects or cancels | Producer failure | That event is dropped downstream |
//! | Subscriber added during dispatch | Re-entrant `subscribe` | Sees the next emission, not the current one |
//! | Concurrent emits | Producers on several threads | Each dispatch is ordered; dispatches may interleave |

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::config::{ConfigError, ObservableConfig, ReplayPolicy};
use crate::promise::Promise;
use crate::registry::{CallbackId, CallbackList, Synchronized};

/// One emission, shared between all subscribers.
type Emission<T> = Arc<Option<T>>;
type Listener<T> = Arc<dyn Fn(&Emission<T>) + Send + Sync>;

struct ObservableInner<T> {
    callbacks: CallbackList<Listener<T>>,
    /// Most recent emission; only tracked under `ReplayPolicy::Latest`.
    latest: Option<Emission<T>>,
    emitted: u64,
    config: ObservableConfig,
}

/// A live, unbuffered stream of optional values.
///
/// Cloning an `Observable` creates a new handle to the **same** stream:
/// both handles share subscribers and either may emit.
pub struct Observable<T> {
    shared: Arc<Synchronized<ObservableInner<T>>>,
}

// Manual Clone: shares the same Arc.
impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.with(|inner| {
            f.debug_struct("Observable")
                .field("label", &inner.config.label)
                .field("replay", &inner.config.replay)
                .field("subscriber_count", &inner.callbacks.len())
                .field("emitted", &inner.emitted)
                .finish()
        })
    }
}

impl<T: Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    /// Create an unbuffered observable with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ObservableConfig::default())
    }

    /// Create an observable that replays its latest emission to new
    /// subscribers.
    #[must_use]
    pub fn cached() -> Self {
        Self::with_config(ObservableConfig::cached())
    }

    /// Like [`with_config`](Self::with_config), but rejects a configuration
    /// that fails [`ObservableConfig::validate`].
    pub fn try_with_config(config: ObservableConfig) -> Result<Self, Vec<ConfigError>> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Create an observable with explicit configuration.
    ///
    /// The configuration is used as given and is not validated; see
    /// [`try_with_config`](Self::try_with_config).
    #[must_use]
    pub fn with_config(config: ObservableConfig) -> Self {
        Self {
            shared: Arc::new(Synchronized::new(ObservableInner {
                callbacks: CallbackList::new(),
                latest: None,
                emitted: 0,
                config,
            })),
        }
    }

    /// The configuration this observable was created with.
    #[must_use]
    pub fn config(&self) -> ObservableConfig {
        self.shared.with(|inner| inner.config.clone())
    }

    /// Number of registered subscribers, including combinator links.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.with(|inner| inner.callbacks.len())
    }

    /// Number of emissions so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.shared.with(|inner| inner.emitted)
    }

    /// Publish a value to every current subscriber, in registration order.
    pub fn emit(&self, value: Option<T>) {
        self.emit_shared(Arc::new(value));
    }

    /// Publish a present value. Shorthand for `emit(Some(value))`.
    pub fn emit_value(&self, value: T) {
        self.emit(Some(value));
    }

    fn emit_shared(&self, emission: Emission<T>) {
        let callbacks = self.shared.with(|inner| {
            inner.emitted += 1;
            if inner.config.replay == ReplayPolicy::Latest {
                inner.latest = Some(Arc::clone(&emission));
            }
            inner.callbacks.snapshot()
        });

        #[cfg(feature = "tracing")]
        trace!(
            label = self.label().as_deref().unwrap_or("-"),
            subscribers = callbacks.len(),
            present = emission.is_some(),
            "observable emit"
        );

        for callback in &callbacks {
            callback(&emission);
        }
    }

    #[cfg(feature = "tracing")]
    fn label(&self) -> Option<String> {
        self.shared.with(|inner| inner.config.label.clone())
    }

    /// Register a callback and run the replay hook for it.
    fn add_callback(&self, listener: Listener<T>) -> CallbackId {
        let (id, replay) = self.shared.with(|inner| {
            let id = inner.callbacks.push(Arc::clone(&listener));
            (id, inner.latest.clone())
        });
        if let Some(emission) = replay {
            listener(&emission);
        }
        id
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        self.shared.with(|inner| inner.callbacks.remove(id))
    }

    /// Observe every emission without altering the stream.
    ///
    /// The callback stays attached for the lifetime of this observable.
    /// Returns this observable so calls can be chained.
    pub fn tap<F>(&self, observer: F) -> Self
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.add_callback(Arc::new(move |emission: &Emission<T>| {
            observer((**emission).as_ref());
        }));
        self.clone()
    }

    /// Observe every emission until the returned [`Subscription`] is
    /// dropped or cancelled.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        let id = self.add_callback(Arc::new(move |emission: &Emission<T>| {
            observer((**emission).as_ref());
        }));
        let target: Weak<dyn Detach> = Arc::downgrade(&self.shared) as Weak<dyn Detach>;
        Subscription { target, id }
    }

    /// Build a downstream observable fed by `ingest` on every emission.
    fn derive<Y, F>(&self, ingest: F) -> Observable<Y>
    where
        Y: Send + Sync + 'static,
        F: Fn(&Observable<Y>, &Emission<T>) + Send + Sync + 'static,
    {
        let downstream = Observable::new();
        let target = downstream.clone();
        self.add_callback(Arc::new(move |emission: &Emission<T>| {
            ingest(&target, emission);
        }));
        downstream
    }

    /// Transform every emission; the result is always present.
    pub fn map<Y, F>(&self, transform: F) -> Observable<Y>
    where
        Y: Send + Sync + 'static,
        F: Fn(Option<&T>) -> Y + Send + Sync + 'static,
    {
        self.derive(move |target, emission| {
            target.emit(Some(transform((**emission).as_ref())));
        })
    }

    /// Transform every emission; the transform decides presence.
    pub fn map_optional<Y, F>(&self, transform: F) -> Observable<Y>
    where
        Y: Send + Sync + 'static,
        F: Fn(Option<&T>) -> Option<Y> + Send + Sync + 'static,
    {
        self.derive(move |target, emission| {
            target.emit(transform((**emission).as_ref()));
        })
    }

    /// Forward only emissions for which `predicate` returns true.
    pub fn select<F>(&self, predicate: F) -> Observable<T>
    where
        F: Fn(Option<&T>) -> bool + Send + Sync + 'static,
    {
        self.derive(move |target, emission| {
            if predicate((**emission).as_ref()) {
                target.emit_shared(Arc::clone(emission));
            }
        })
    }

    /// Suppress the first `amount` emissions, then forward everything.
    pub fn skip(&self, amount: usize) -> Observable<T> {
        let remaining = AtomicUsize::new(amount);
        self.derive(move |target, emission| {
            let suppressed = remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                    left.checked_sub(1)
                })
                .is_ok();
            if !suppressed {
                target.emit_shared(Arc::clone(emission));
            }
        })
    }

    /// Replace absent emissions with `fallback`; present ones pass through.
    pub fn default_value(&self, fallback: T) -> Observable<T> {
        let fallback: Emission<T> = Arc::new(Some(fallback));
        self.derive(move |target, emission| {
            if emission.is_some() {
                target.emit_shared(Arc::clone(emission));
            } else {
                target.emit_shared(Arc::clone(&fallback));
            }
        })
    }

    /// Forward only present emissions.
    pub fn present(&self) -> Observable<T> {
        self.derive(|target, emission| {
            if emission.is_some() {
                target.emit_shared(Arc::clone(emission));
            }
        })
    }

    /// Start a promise per emission and forward each resolved value.
    ///
    /// Rejected or cancelled promises produce nothing downstream. Values are
    /// forwarded in resolution order, which need not match emission order.
    pub fn then<Y, E, F>(&self, transform: F) -> Observable<Y>
    where
        Y: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Fn(Option<&T>) -> Promise<Y, E> + Send + Sync + 'static,
    {
        self.derive(move |target, emission| {
            let promise = transform((**emission).as_ref());
            let target = target.clone();
            promise.then(move |value: &Y| target.emit(Some(value.clone())));
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// The most recent emission under [`ReplayPolicy::Latest`].
    ///
    /// `None` means nothing was emitted yet (or replay is off);
    /// `Some(None)` means the last emission was absent.
    #[must_use]
    pub fn latest(&self) -> Option<Option<T>> {
        self.shared
            .with(|inner| inner.latest.as_ref().map(|emission| (**emission).clone()))
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: CallbackId) -> bool;
    fn is_attached(&self, id: CallbackId) -> bool;
}

impl<T: Send + Sync + 'static> Detach for Synchronized<ObservableInner<T>> {
    fn detach(&self, id: CallbackId) -> bool {
        self.with(|inner| inner.callbacks.remove(id))
    }

    fn is_attached(&self, id: CallbackId) -> bool {
        self.with(|inner| inner.callbacks.contains(id))
    }
}

/// RAII guard for a callback registered with [`Observable::subscribe`].
///
/// Dropping the guard removes the callback. It does not keep the observable
/// alive.
pub struct Subscription {
    target: Weak<dyn Detach>,
    id: CallbackId,
}

impl Subscription {
    /// Id of the registered callback.
    #[must_use]
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// True while the callback is still registered with a live observable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.target
            .upgrade()
            .is_some_and(|target| target.is_attached(self.id))
    }

    /// Remove the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(target) = self.target.upgrade() {
            target.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    /// Remove a subscriber registered on this observable.
    ///
    /// Returns `false` if the subscription belongs to another observable or
    /// was already removed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        if !std::ptr::addr_eq(subscription.target.as_ptr(), Arc::as_ptr(&self.shared)) {
            return false;
        }
        self.remove_callback(subscription.id)
    }
}
