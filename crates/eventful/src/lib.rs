#![forbid(unsafe_code)]

//! Thread-safe observables and promises.
//!
//! This crate provides two reactive primitives for propagating values
//! between producers and consumers:
//!
//! - [`Observable`]: a live, unbuffered multi-value stream with composable
//!   combinators (`map`, `select`, `skip`, `default_value`, `present`,
//!   `then`, `tap`).
//! - [`Promise`]: a single-shot value that resolves, fails or is cancelled
//!   exactly once, replays its terminal state to late subscribers, and
//!   chains with `then` / `then_promise`.
//!
//! # Architecture
//!
//! Both types are cloneable handles around one `Arc<Synchronized<..>>`
//! (see [`registry`]). Callbacks run synchronously on the thread that emits
//! or settles; there is no executor or background thread. State and callback
//! queues are updated under the lock, and callbacks are always invoked after
//! the lock is released.
//!
//! ```text
//!  producer ──emit──► Observable ──map──► Observable ──tap──► consumer
//!                          │
//!                          └──then(f: T -> Promise<Y>)──► Observable<Y>
//!
//!  producer ──resolve/fail/cancel──► Promise ──then──► Promise ──error/always──► consumer
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use eventful::{Observable, Promise};
//!
//! let clicks = Observable::<u32>::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! clicks
//!     .skip(1)
//!     .map(|n| n.copied().unwrap_or(0) * 2)
//!     .tap(move |v| sink.lock().unwrap().push(v.copied()));
//! for n in 1..=3 {
//!     clicks.emit_value(n);
//! }
//! assert_eq!(*seen.lock().unwrap(), vec![Some(4), Some(6)]);
//!
//! let answer = Promise::<i32>::resolved(42)
//!     .then(|v| v.to_string())
//!     .then(|s| s.parse::<i32>().unwrap_or(0));
//! assert_eq!(answer.try_value().as_deref(), Some(&42));
//! ```
//!
//! # Features
//!
//! - `tracing`: emit `trace`/`debug` events for dispatch and promise
//!   transitions.

pub mod bind;
pub mod config;
pub mod error;
pub mod observable;
pub mod promise;
pub mod registry;

pub use bind::{Sink, SinkFn, bind};
pub use config::{ConfigError, ConfigParse, ObservableConfig, ReplayPolicy};
pub use error::Error;
pub use observable::{Observable, Subscription};
pub use promise::{Promise, PromiseStatus};
pub use registry::{CallbackId, CallbackList, Synchronized};
