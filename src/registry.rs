//! Thread registries.
//!
//! The logger never tracks producer threads on its own behalf; it asks an
//! attached [`ThreadRegistry`] whether it is safe to swap schedulers.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers whether any non-main thread is currently registered.
pub trait ThreadRegistry: Send + Sync + fmt::Debug {
    fn has_threads_registered(&self) -> bool;
}

/// A [`ThreadRegistry`] backed by an atomic counter of live threads.
///
/// [`crate::LoggedThread`] increments it on start and decrements it when the
/// thread is joined.
#[derive(Debug, Default)]
pub struct ThreadCounter {
    registered: AtomicUsize,
}

impl ThreadCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registered: AtomicUsize::new(0),
        }
    }

    pub fn increment(&self) {
        self.registered.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement, saturating at zero.
    pub fn decrement(&self) {
        let _ = self
            .registered
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }
}

impl ThreadRegistry for ThreadCounter {
    fn has_threads_registered(&self) -> bool {
        self.count() > 0
    }
}
