#![forbid(unsafe_code)]

//! Errors reported by harness fixtures.

use std::fmt;
use std::time::Duration;

/// Failure of a harness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// An expectation was not fulfilled in time.
    Timeout {
        description: String,
        timeout: Duration,
        fulfilled: usize,
        expected: usize,
    },
    /// An observed value differs from the expected one.
    Mismatch {
        index: usize,
        expected: String,
        actual: String,
    },
    /// The number of observed values differs from the expected count.
    Count {
        expected: usize,
        actual: usize,
        unmatched: String,
    },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout {
                description,
                timeout,
                fulfilled,
                expected,
            } => write!(
                f,
                "expectation '{description}' timed out after {timeout:?} ({fulfilled}/{expected} fulfilled)"
            ),
            Self::Mismatch {
                index,
                expected,
                actual,
            } => write!(f, "value #{index}: expected {expected}, got {actual}"),
            Self::Count {
                expected,
                actual,
                unmatched,
            } => write!(
                f,
                "satisfied {actual} of {expected} expectations; unmatched: {unmatched}"
            ),
        }
    }
}

impl std::error::Error for HarnessError {}
