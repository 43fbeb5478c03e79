#![forbid(unsafe_code)]

//! Synchronized callback registry shared by [`Observable`] and [`Promise`].
//!
//! Two small pieces live here:
//!
//! - [`Synchronized<T>`]: a mutex wrapper with scoped, poison-tolerant
//!   acquisition. Every mutation of observable or promise state goes through
//!   [`Synchronized::with`], so the guard is released on every exit path,
//!   including early returns for already-terminal promises.
//! - [`CallbackList<C>`]: an ordered list of callbacks keyed by a
//!   monotonically increasing id, so individual entries can be removed
//!   without disturbing registration order.
//!
//! # Invariants
//!
//! 1. Ids handed out by one list are unique and strictly increasing.
//! 2. Iteration order is registration order; removal never reorders.
//! 3. No user callback ever runs while a [`Synchronized`] guard is held.
//!    Callers snapshot or drain under the lock, then invoke outside it.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Poisoned mutex | A panic while the guard was held | Inner state is recovered and used as-is |
//! | Removing an unknown id | Entry already removed or drained | No-op, returns `false` |
//!
//! [`Observable`]: crate::Observable
//! [`Promise`]: crate::Promise

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Identifier of a registered callback within one [`CallbackList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    /// Raw numeric value of the id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Ordered callback storage. Not synchronized on its own; wrap it (or the
/// struct that owns it) in a [`Synchronized`].
pub struct CallbackList<C> {
    entries: Vec<(CallbackId, C)>,
    next_id: u64,
}

impl<C> Default for CallbackList<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for CallbackList<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackList")
            .field("len", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<C> CallbackList<C> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Append a callback and return its id.
    pub fn push(&mut self, callback: C) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Remove the callback with the given id. Returns `true` if it existed.
    pub fn remove(&mut self, id: CallbackId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// True if a callback with `id` is still registered.
    #[must_use]
    pub fn contains(&self, id: CallbackId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Take every callback out of the list, in registration order.
    ///
    /// Ids keep increasing afterwards; a drained list never reuses an id.
    pub fn drain(&mut self) -> Vec<C> {
        self.entries.drain(..).map(|(_, callback)| callback).collect()
    }

    /// Drop every callback without returning them.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate callbacks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.entries.iter().map(|(_, callback)| callback)
    }
}

impl<C: Clone> CallbackList<C> {
    /// Clone the current callbacks, in registration order.
    ///
    /// Used by dispatch: take the snapshot under the lock, invoke after
    /// releasing it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<C> {
        self.iter().cloned().collect()
    }
}

/// Mutual-exclusion wrapper with scoped acquisition.
pub struct Synchronized<T> {
    inner: Mutex<T>,
}

impl<T: Default> Default for Synchronized<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Synchronized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|inner| f.debug_tuple("Synchronized").field(inner).finish())
    }
}

impl<T> Synchronized<T> {
    /// Wrap a value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Run `f` with exclusive access to the value and return its result.
    ///
    /// The guard is dropped when `f` returns. A poisoned lock is recovered:
    /// callbacks never run under this lock, so a panic here can only come
    /// from bookkeeping that leaves the state consistent.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Consume the wrapper and return the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
