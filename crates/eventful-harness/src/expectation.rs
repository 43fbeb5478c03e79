#![forbid(unsafe_code)]

//! Waitable expectations for callbacks that may fire on another thread.
//!
//! An [`Expectation`] counts calls to [`Expectation::fulfill`] and lets a
//! test block until the expected count is reached or a timeout elapses.
//! Handles are cheap to clone and can be moved into callbacks.
//!
//! # Invariants
//!
//! 1. `fulfilled()` never decreases.
//! 2. `wait` returns `Ok` as soon as `fulfilled() >= expected()`, including
//!    when that was already true before the call.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tracing::warn;

use crate::error::HarnessError;

#[derive(Debug)]
struct Shared {
    description: String,
    expected: usize,
    fulfilled: Mutex<usize>,
    cond: Condvar,
}

/// A countdown of expected callback invocations.
#[derive(Debug, Clone)]
pub struct Expectation {
    shared: Arc<Shared>,
}

impl Expectation {
    /// Expect exactly one fulfillment.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_count(description, 1)
    }

    /// Expect `expected` fulfillments.
    #[must_use]
    pub fn with_count(description: impl Into<String>, expected: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                description: description.into(),
                expected,
                fulfilled: Mutex::new(0),
                cond: Condvar::new(),
            }),
        }
    }

    /// Record one fulfillment and wake waiters.
    pub fn fulfill(&self) {
        let mut fulfilled = self
            .shared
            .fulfilled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *fulfilled += 1;
        self.shared.cond.notify_all();
    }

    /// Number of fulfillments so far.
    #[must_use]
    pub fn fulfilled(&self) -> usize {
        *self
            .shared
            .fulfilled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of fulfillments required.
    #[must_use]
    pub fn expected(&self) -> usize {
        self.shared.expected
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.shared.description
    }

    /// True once the expected count is reached.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled() >= self.shared.expected
    }

    /// Block until fulfilled or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Result<(), HarnessError> {
        let guard = self
            .shared
            .fulfilled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .shared
            .cond
            .wait_timeout_while(guard, timeout, |fulfilled| {
                *fulfilled < self.shared.expected
            })
            .unwrap_or_else(PoisonError::into_inner);
        let fulfilled = *guard;
        if fulfilled >= self.shared.expected {
            return Ok(());
        }
        warn!(
            description = %self.shared.description,
            fulfilled,
            expected = self.shared.expected,
            "expectation timed out"
        );
        Err(HarnessError::Timeout {
            description: self.shared.description.clone(),
            timeout,
            fulfilled,
            expected: self.shared.expected,
        })
    }
}

/// Wait for every expectation, failing on the first one that times out.
pub fn wait_all(expectations: &[&Expectation], timeout: Duration) -> Result<(), HarnessError> {
    expectations.iter().try_for_each(|e| e.wait(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn already_fulfilled_returns_immediately() {
        let e = Expectation::new("ready");
        e.fulfill();
        assert!(e.is_fulfilled());
        assert_eq!(e.wait(Duration::from_millis(1)), Ok(()));
    }

    #[test]
    fn fulfilled_from_other_thread() {
        let e = Expectation::with_count("two calls", 2);
        let handle = e.clone();
        let worker = thread::spawn(move || {
            handle.fulfill();
            handle.fulfill();
        });
        assert_eq!(e.wait(Duration::from_secs(5)), Ok(()));
        worker.join().unwrap();
        assert_eq!(e.fulfilled(), 2);
    }

    #[test]
    fn times_out() {
        let e = Expectation::with_count("never", 1);
        let err = e.wait(Duration::from_millis(10)).unwrap_err();
        match err {
            HarnessError::Timeout {
                fulfilled, expected, ..
            } => {
                assert_eq!(fulfilled, 0);
                assert_eq!(expected, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn wait_all_checks_each() {
        let a = Expectation::new("a");
        let b = Expectation::new("b");
        a.fulfill();
        assert!(wait_all(&[&a, &b], Duration::from_millis(5)).is_err());
        b.fulfill();
        assert!(wait_all(&[&a, &b], Duration::from_millis(5)).is_ok());
        assert_eq!(a.description(), "a");
        assert_eq!(b.expected(), 1);
    }
}
