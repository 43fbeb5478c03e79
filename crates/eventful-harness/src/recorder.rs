#![forbid(unsafe_code)]

//! Thread-safe capture of observable emissions and promise callbacks.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use eventful::{Observable, Promise};

use crate::error::HarnessError;

#[derive(Debug)]
struct Log<T> {
    values: Mutex<Vec<Option<T>>>,
    cond: Condvar,
}

/// Records every emission of the observables it is attached to.
#[derive(Debug)]
pub struct Recorder<T> {
    log: Arc<Log<T>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Recorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Arc::new(Log {
                values: Mutex::new(Vec::new()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Create a recorder and tap it onto `observable`.
    #[must_use]
    pub fn attach(observable: &Observable<T>) -> Self {
        let recorder = Self::new();
        observable.tap(recorder.observer());
        recorder
    }

    /// A callback that records into this recorder.
    pub fn observer(&self) -> impl Fn(Option<&T>) + Send + Sync + 'static {
        let recorder = self.clone();
        move |value| recorder.record(value)
    }

    /// Record one value.
    pub fn record(&self, value: Option<&T>) {
        let mut values = self.lock();
        values.push(value.cloned());
        self.log.cond.notify_all();
    }

    /// Everything recorded so far, in order.
    #[must_use]
    pub fn values(&self) -> Vec<Option<T>> {
        self.lock().clone()
    }

    /// Present values only, in order.
    #[must_use]
    pub fn present(&self) -> Vec<T> {
        self.lock().iter().flatten().cloned().collect()
    }

    /// Number of recorded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Block until at least `count` values are recorded.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Result<(), HarnessError> {
        let guard = self.lock();
        let (guard, _) = self
            .log
            .cond
            .wait_timeout_while(guard, timeout, |values| values.len() < count)
            .unwrap_or_else(PoisonError::into_inner);
        if guard.len() >= count {
            Ok(())
        } else {
            Err(HarnessError::Timeout {
                description: "recorder".into(),
                timeout,
                fulfilled: guard.len(),
                expected: count,
            })
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Option<T>>> {
        self.log
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Callback invocation counts observed on one promise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeCounts {
    pub success: usize,
    pub error: usize,
    pub always: usize,
    pub cancelled: usize,
}

/// Attaches one handler of every kind to a promise and counts invocations.
#[derive(Debug, Clone)]
pub struct PromiseProbe {
    counts: Arc<Mutex<ProbeCounts>>,
}

impl PromiseProbe {
    /// Attach success, error, always and cancelled handlers to `promise`.
    pub fn attach<T, E>(promise: &Promise<T, E>) -> Self
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let probe = Self {
            counts: Arc::new(Mutex::new(ProbeCounts::default())),
        };
        let p = probe.clone();
        promise.then(move |_| p.bump(|c| c.success += 1));
        let p = probe.clone();
        promise.error(move |_| p.bump(|c| c.error += 1));
        let p = probe.clone();
        promise.always(move |_, _| p.bump(|c| c.always += 1));
        let p = probe.clone();
        promise.cancelled(move || p.bump(|c| c.cancelled += 1));
        probe
    }

    /// Snapshot of the counts.
    #[must_use]
    pub fn counts(&self) -> ProbeCounts {
        *self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self, f: impl FnOnce(&mut ProbeCounts)) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *counts);
    }
}
