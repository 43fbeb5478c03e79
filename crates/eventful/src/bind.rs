#![forbid(unsafe_code)]

//! One-directional bindings from an observable into caller-owned slots.
//!
//! A [`Sink`] is anything that can report whether it still exists and accept
//! a value. [`bind`] taps an observable and copies each emission into the
//! sink while it is alive; once the sink is gone, emissions are discarded
//! without error.
//!
//! The observable holds the sink, so a sink should refer to its slot weakly
//! (for example through a [`Weak`]) if the slot's owner is meant to control
//! its lifetime.

use std::sync::{Mutex, PoisonError, Weak};

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::observable::Observable;

/// Destination for bound values.
pub trait Sink<T>: Send + Sync + 'static {
    /// True while the destination still exists.
    fn is_alive(&self) -> bool;

    /// Store one emission.
    fn accept(&self, value: Option<&T>);
}

impl<T> Sink<T> for Weak<Mutex<Option<T>>>
where
    T: Clone + Send + 'static,
{
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }

    fn accept(&self, value: Option<&T>) {
        // The slot may disappear between the liveness check and here.
        if let Some(slot) = self.upgrade() {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = value.cloned();
        }
    }
}

/// A sink built from a liveness probe and a setter.
pub struct SinkFn<A, S> {
    alive: A,
    set: S,
}

impl<A, S> SinkFn<A, S> {
    /// Combine a liveness probe and a setter into a sink.
    pub fn new(alive: A, set: S) -> Self {
        Self { alive, set }
    }
}

impl<T, A, S> Sink<T> for SinkFn<A, S>
where
    A: Fn() -> bool + Send + Sync + 'static,
    S: Fn(Option<&T>) + Send + Sync + 'static,
{
    fn is_alive(&self) -> bool {
        (self.alive)()
    }

    fn accept(&self, value: Option<&T>) {
        (self.set)(value);
    }
}

/// Copy every emission of `observable` into `sink` while the sink is alive.
///
/// Returns the observable, like [`Observable::tap`].
pub fn bind<T, S>(observable: &Observable<T>, sink: S) -> Observable<T>
where
    T: Send + Sync + 'static,
    S: Sink<T>,
{
    observable.tap(move |value| {
        if sink.is_alive() {
            sink.accept(value);
        } else {
            #[cfg(feature = "tracing")]
            trace!("bound sink gone, emission discarded");
        }
    })
}
