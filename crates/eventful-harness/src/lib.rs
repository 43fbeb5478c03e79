#![forbid(unsafe_code)]

//! Test harness and fixtures for `eventful`.
//!
//! - [`Expectation`]: wait (with timeout) for callbacks that fire on other
//!   threads.
//! - [`Recorder`]: thread-safe capture of observable emissions.
//! - [`PromiseProbe`]: per-kind callback counts for a promise.
//! - [`expect_sequence`] / [`expect_values`]: run inputs through a pipeline
//!   and compare the output.
//! - [`init_test_tracing`]: opt-in log output via `EVENTFUL_TEST_LOG`.

pub mod error;
pub mod expectation;
pub mod recorder;
pub mod sequence;
pub mod trace;

pub use error::HarnessError;
pub use expectation::{Expectation, wait_all};
pub use recorder::{ProbeCounts, PromiseProbe, Recorder};
pub use sequence::{expect_sequence, expect_values};
pub use trace::init_test_tracing;
