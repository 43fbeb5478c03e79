#![forbid(unsafe_code)]

//! Single-shot promise with terminal-state replay and cancellation.
//!
//! # Design
//!
//! [`Promise<T, E>`] is a cloneable handle to shared state guarded by one
//! mutex: the current [`PromiseStatus`] plus four callback queues (success,
//! error, always, cancellation). The state machine has one way out of
//! `Pending` per terminal state:
//!
//! ```text
//!             resolve(v)
//!          ┌─────────────► Resolved(v)
//!          │   fail(e)
//! Pending ─┼─────────────► Rejected(e)
//!          │   cancel()
//!          └─────────────► Cancelled
//! ```
//!
//! Terminal states are final. A second `resolve`, `fail` or `cancel`, in any
//! combination, returns `false` and fires nothing.
//!
//! # Invariants
//!
//! 1. A callback registered before the matching terminal state fires exactly
//!    once, on the thread that performs the transition.
//! 2. A callback registered after the matching terminal state fires exactly
//!    once, immediately, on the registering thread.
//! 3. Callbacks for a non-matching terminal state never fire and are dropped
//!    at transition time.
//! 4. On resolution, success callbacks run before always callbacks; on
//!    rejection, error callbacks run before always callbacks.
//! 5. The lock is never held while a callback runs, so callbacks may freely
//!    register on or settle any promise, including their own.
//!
//! # Chaining
//!
//! [`Promise::then`] and [`Promise::then_promise`] derive a child promise.
//! The child resolves from the handler's result; a rejection or cancellation
//! of the parent skips the handler and is forwarded to the child unchanged,
//! so failures travel down a chain until an `error` or `always` handler
//! consumes them. `then_promise` flattens: the child adopts whatever the
//! handler's promise eventually does.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No handler for the terminal state | Fire-and-forget use | Notification dropped silently |
//! | Settling a terminal promise | Racing producers, double completion | Ignored, returns `false` |
//! | Handler promise never settles | Producer dropped its handle | Child stays pending |

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::error::Error;
use crate::registry::{CallbackList, Synchronized};

type SuccessFn<T> = Box<dyn FnOnce(&Arc<T>) + Send>;
type ErrorFn<E> = Box<dyn FnOnce(&Arc<E>) + Send>;
type AlwaysFn<T, E> = Box<dyn FnOnce(Option<&T>, Option<&E>) + Send>;
type CancelFn = Box<dyn FnOnce() + Send>;

/// Payload-free view of a promise's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseStatus {
    Pending,
    Resolved,
    Rejected,
    Cancelled,
}

impl PromiseStatus {
    /// True for `Resolved`, `Rejected` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PromiseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum State<T, E> {
    Pending,
    Resolved(Arc<T>),
    Rejected(Arc<E>),
    Cancelled,
}

impl<T, E> State<T, E> {
    fn status(&self) -> PromiseStatus {
        match self {
            Self::Pending => PromiseStatus::Pending,
            Self::Resolved(_) => PromiseStatus::Resolved,
            Self::Rejected(_) => PromiseStatus::Rejected,
            Self::Cancelled => PromiseStatus::Cancelled,
        }
    }
}

struct PromiseInner<T, E> {
    state: State<T, E>,
    on_success: CallbackList<SuccessFn<T>>,
    on_error: CallbackList<ErrorFn<E>>,
    on_always: CallbackList<AlwaysFn<T, E>>,
    on_cancel: CallbackList<CancelFn>,
}

impl<T, E> PromiseInner<T, E> {
    fn new(state: State<T, E>) -> Self {
        Self {
            state,
            on_success: CallbackList::new(),
            on_error: CallbackList::new(),
            on_always: CallbackList::new(),
            on_cancel: CallbackList::new(),
        }
    }

    fn clear_all(&mut self) {
        self.on_success.clear();
        self.on_error.clear();
        self.on_always.clear();
        self.on_cancel.clear();
    }
}

/// A value that resolves, fails, or is cancelled exactly once.
///
/// Cloning a `Promise` creates a new handle to the **same** state. Any
/// handle may settle it; every handle observes the same outcome.
///
/// The error type defaults to [`Error`]. Name the value type explicitly to
/// pick up the default, e.g. `Promise::<i32>::new()`.
pub struct Promise<T, E = Error> {
    shared: Arc<Synchronized<PromiseInner<T, E>>>,
}

// Manual Clone: shares the same Arc without requiring `T: Clone`.
impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.with(|inner| {
            f.debug_struct("Promise")
                .field("status", &inner.state.status())
                .field("success_callbacks", &inner.on_success.len())
                .field("error_callbacks", &inner.on_error.len())
                .field("always_callbacks", &inner.on_always.len())
                .field("cancel_callbacks", &inner.on_cancel.len())
                .finish()
        })
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Promise<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn with_state(state: State<T, E>) -> Self {
        Self {
            shared: Arc::new(Synchronized::new(PromiseInner::new(state))),
        }
    }

    /// Create a pending promise.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(State::Pending)
    }

    /// Create a promise that is already resolved with `value`.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::with_state(State::Resolved(Arc::new(value)))
    }

    /// Create a promise that is already rejected with `error`.
    #[must_use]
    pub fn rejected(error: E) -> Self {
        Self::with_state(State::Rejected(Arc::new(error)))
    }

    /// Create a settled promise from a `Result`.
    #[must_use]
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::resolved(value),
            Err(error) => Self::rejected(error),
        }
    }

    /// Current state without payload.
    #[must_use]
    pub fn status(&self) -> PromiseStatus {
        self.shared.with(|inner| inner.state.status())
    }

    /// True while no terminal state has been entered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status() == PromiseStatus::Pending
    }

    /// True once resolved, rejected or cancelled.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The resolved value, if any.
    #[must_use]
    pub fn try_value(&self) -> Option<Arc<T>> {
        self.shared.with(|inner| match &inner.state {
            State::Resolved(value) => Some(Arc::clone(value)),
            _ => None,
        })
    }

    /// The rejection error, if any.
    #[must_use]
    pub fn try_error(&self) -> Option<Arc<E>> {
        self.shared.with(|inner| match &inner.state {
            State::Rejected(error) => Some(Arc::clone(error)),
            _ => None,
        })
    }

    /// Resolve with `value`. Returns `false` if the promise was already
    /// terminal, in which case nothing fires.
    pub fn resolve(&self, value: T) -> bool {
        self.resolve_shared(Arc::new(value))
    }

    /// Reject with `error`. Returns `false` if the promise was already
    /// terminal, in which case nothing fires.
    pub fn fail(&self, error: E) -> bool {
        self.fail_shared(Arc::new(error))
    }

    /// Resolve or reject from a `Result`.
    pub fn settle(&self, result: Result<T, E>) -> bool {
        match result {
            Ok(value) => self.resolve(value),
            Err(error) => self.fail(error),
        }
    }

    /// Cancel the promise. Only cancellation callbacks fire; every other
    /// queued callback is dropped. Returns `false` if the promise was
    /// already terminal (including already cancelled).
    pub fn cancel(&self) -> bool {
        let taken = self.shared.with(|inner| {
            if let State::Pending = inner.state {
                inner.state = State::Cancelled;
                let cancel = inner.on_cancel.drain();
                inner.clear_all();
                Ok(cancel)
            } else {
                Err(inner.state.status())
            }
        });

        let callbacks = match taken {
            Ok(callbacks) => callbacks,
            Err(_current) => {
                #[cfg(feature = "tracing")]
                debug!(attempted = "cancel", current = %_current, "promise transition ignored");
                return false;
            }
        };

        #[cfg(feature = "tracing")]
        trace!(status = "cancelled", cancel = callbacks.len(), "promise settled");

        for callback in callbacks {
            callback();
        }
        true
    }

    fn resolve_shared(&self, value: Arc<T>) -> bool {
        let taken = self.shared.with(|inner| {
            if let State::Pending = inner.state {
                inner.state = State::Resolved(Arc::clone(&value));
                let success = inner.on_success.drain();
                let always = inner.on_always.drain();
                inner.clear_all();
                Ok((success, always))
            } else {
                Err(inner.state.status())
            }
        });

        let (success, always) = match taken {
            Ok(queues) => queues,
            Err(_current) => {
                #[cfg(feature = "tracing")]
                debug!(attempted = "resolve", current = %_current, "promise transition ignored");
                return false;
            }
        };

        #[cfg(feature = "tracing")]
        trace!(
            status = "resolved",
            success = success.len(),
            always = always.len(),
            "promise settled"
        );

        for callback in success {
            callback(&value);
        }
        for callback in always {
            callback(Some(&*value), None);
        }
        true
    }

    fn fail_shared(&self, error: Arc<E>) -> bool {
        let taken = self.shared.with(|inner| {
            if let State::Pending = inner.state {
                inner.state = State::Rejected(Arc::clone(&error));
                let errors = inner.on_error.drain();
                let always = inner.on_always.drain();
                inner.clear_all();
                Ok((errors, always))
            } else {
                Err(inner.state.status())
            }
        });

        let (errors, always) = match taken {
            Ok(queues) => queues,
            Err(_current) => {
                #[cfg(feature = "tracing")]
                debug!(attempted = "fail", current = %_current, "promise transition ignored");
                return false;
            }
        };

        #[cfg(feature = "tracing")]
        trace!(
            status = "rejected",
            error = errors.len(),
            always = always.len(),
            "promise settled"
        );

        for callback in errors {
            callback(&error);
        }
        for callback in always {
            callback(None, Some(&*error));
        }
        true
    }

    fn on_resolved(&self, callback: SuccessFn<T>) {
        let ready = self.shared.with(move |inner| match &inner.state {
            State::Pending => {
                inner.on_success.push(callback);
                None
            }
            State::Resolved(value) => Some((callback, Arc::clone(value))),
            State::Rejected(_) | State::Cancelled => None,
        });
        if let Some((callback, value)) = ready {
            callback(&value);
        }
    }

    fn on_rejected(&self, callback: ErrorFn<E>) {
        let ready = self.shared.with(move |inner| match &inner.state {
            State::Pending => {
                inner.on_error.push(callback);
                None
            }
            State::Rejected(error) => Some((callback, Arc::clone(error))),
            State::Resolved(_) | State::Cancelled => None,
        });
        if let Some((callback, error)) = ready {
            callback(&error);
        }
    }

    fn on_cancelled(&self, callback: CancelFn) {
        let ready = self.shared.with(move |inner| match &inner.state {
            State::Pending => {
                inner.on_cancel.push(callback);
                None
            }
            State::Cancelled => Some(callback),
            State::Resolved(_) | State::Rejected(_) => None,
        });
        if let Some(callback) = ready {
            callback();
        }
    }

    /// Forward every outcome of `source` into `self`.
    fn adopt(&self, source: &Promise<T, E>) {
        let target = self.clone();
        source.on_resolved(Box::new(move |value| {
            target.resolve_shared(Arc::clone(value));
        }));
        let target = self.clone();
        source.on_rejected(Box::new(move |error| {
            target.fail_shared(Arc::clone(error));
        }));
        let target = self.clone();
        source.on_cancelled(Box::new(move || {
            target.cancel();
        }));
    }

    /// Forward rejection and cancellation of `self` into `child`.
    fn forward_failure<U>(&self, child: &Promise<U, E>)
    where
        U: Send + Sync + 'static,
    {
        let target = child.clone();
        self.on_rejected(Box::new(move |error| {
            target.fail_shared(Arc::clone(error));
        }));
        let target = child.clone();
        self.on_cancelled(Box::new(move || {
            target.cancel();
        }));
    }

    /// Derive a promise resolved with `on_success(value)`.
    ///
    /// If this promise fails or is cancelled, `on_success` never runs and
    /// the child fails with the same error or is cancelled.
    pub fn then<U, F>(&self, on_success: F) -> Promise<U, E>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let child = Promise::new();
        let target = child.clone();
        self.on_resolved(Box::new(move |value| {
            target.resolve(on_success(&**value));
        }));
        self.forward_failure(&child);
        child
    }

    /// Derive a promise from a handler that itself returns a promise.
    ///
    /// The child adopts the eventual outcome of the returned promise:
    /// resolved, rejected or cancelled. Parent failure and cancellation are
    /// forwarded as with [`then`](Self::then).
    pub fn then_promise<U, F>(&self, on_success: F) -> Promise<U, E>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> Promise<U, E> + Send + 'static,
    {
        let child = Promise::new();
        let target = child.clone();
        self.on_resolved(Box::new(move |value| {
            let inner = on_success(&**value);
            target.adopt(&inner);
        }));
        self.forward_failure(&child);
        child
    }

    /// Register a rejection handler. Returns this promise for chaining.
    pub fn error<F>(&self, on_error: F) -> Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.on_rejected(Box::new(move |error| on_error(&**error)));
        self.clone()
    }

    /// Register a handler for resolution or rejection (never cancellation).
    ///
    /// Receives `(Some(value), None)` or `(None, Some(error))`. Returns this
    /// promise for chaining.
    pub fn always<F>(&self, on_settle: F) -> Self
    where
        F: FnOnce(Option<&T>, Option<&E>) + Send + 'static,
    {
        let callback: AlwaysFn<T, E> = Box::new(on_settle);
        let ready = self.shared.with(move |inner| match &inner.state {
            State::Pending => {
                inner.on_always.push(callback);
                None
            }
            State::Resolved(value) => Some((callback, Some(Arc::clone(value)), None)),
            State::Rejected(error) => Some((callback, None, Some(Arc::clone(error)))),
            State::Cancelled => None,
        });
        if let Some((callback, value, error)) = ready {
            callback(value.as_deref(), error.as_deref());
        }
        self.clone()
    }

    /// Register a cancellation handler. Returns this promise for chaining.
    pub fn cancelled<F>(&self, on_cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_cancelled(Box::new(on_cancel));
        self.clone()
    }
}
