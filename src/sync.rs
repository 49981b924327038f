//! # Synchronization Utilities
//!
//! Consistent mutex, `RwLock` and condition variable handling for the engine.
//!
//! ## Poison policy
//!
//! A producer thread that panics while it holds the renderer or a scheduler
//! lock poisons that lock. For a logging engine the useful behaviour is to
//! keep printing: the held-line stack and the per-thread queues stay
//! structurally valid between operations, and a partially written line is
//! better than losing every later message.
//!
//! - **Release builds**: recover silently.
//! - **Debug builds**: [`lock_recover_debug`] reports the recovery on stderr.
//!
//! | Scenario | Function |
//! |----------|----------|
//! | Mutex access | [`lock_recover`] |
//! | Mutex access with a known call site | [`lock_recover_debug`] |
//! | `RwLock` read | [`read_recover`] |
//! | `RwLock` write | [`write_recover`] |
//! | Condvar wait | [`wait_while_recover`] |
//! | Test code | `.lock().unwrap()` |
//!
//! ```rust
//! use std::sync::Mutex;
//! use conclog::sync::lock_recover;
//!
//! let queue = Mutex::new(vec!["first", "second"]);
//! let guard = lock_recover(&queue);
//! assert_eq!(guard.len(), 2);
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock a mutex, recovering from poison if necessary.
///
/// # Panics
///
/// Never panics.
#[inline]
pub fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock a mutex and report poison recovery in debug builds.
///
/// `context` names the call site (e.g. `"Renderer"`, `"NonblockingScheduler::dequeue"`).
#[inline]
pub fn lock_recover_debug<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        #[cfg(debug_assertions)]
        eprintln!("[conclog::sync] mutex poison recovered at: {context}");
        #[cfg(not(debug_assertions))]
        let _ = context;
        e.into_inner()
    })
}

/// Acquire a read lock, recovering from poison if necessary.
#[inline]
pub fn read_recover<T>(rwlock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write lock, recovering from poison if necessary.
#[inline]
pub fn write_recover<T>(rwlock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Block on `condvar` while `condition` holds, recovering from poison.
///
/// Spurious wakeups are absorbed: the returned guard always observes
/// `condition` as false.
#[inline]
pub fn wait_while_recover<'a, T, F>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
    condition: F,
) -> MutexGuard<'a, T>
where
    F: FnMut(&mut T) -> bool,
{
    condvar
        .wait_while(guard, condition)
        .unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_lock_recover_after_poison() {
        let mutex = Mutex::new(42);
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = mutex.lock().unwrap();
            panic!("intentional panic to poison mutex");
        }));
        assert!(mutex.lock().is_err(), "Mutex should be poisoned");

        let guard = lock_recover(&mutex);
        assert_eq!(*guard, 42);
    }

    #[test]
    fn test_lock_recover_debug_after_poison() {
        let mutex = Mutex::new(String::from("held"));
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut guard = mutex.lock().unwrap();
            guard.push_str(" line");
            panic!("intentional panic");
        }));
        let guard = lock_recover_debug(&mutex, "test_lock_recover_debug_after_poison");
        assert_eq!(*guard, "held line");
    }

    #[test]
    fn test_read_and_write_recover_after_poison() {
        let rwlock = RwLock::new(1_u32);
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut guard = rwlock.write().unwrap();
            *guard = 2;
            panic!("intentional panic during write");
        }));
        assert_eq!(*read_recover(&rwlock), 2);
        *write_recover(&rwlock) = 3;
        assert_eq!(*read_recover(&rwlock), 3);
    }

    #[test]
    fn test_wait_while_recover_wakes_on_condition() {
        let pair = Arc::new((Mutex::new(false), Condvar::new()));
        let notifier = Arc::clone(&pair);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let (flag, condvar) = &*notifier;
            *lock_recover(flag) = true;
            condvar.notify_one();
        });

        let (flag, condvar) = &*pair;
        let guard = wait_while_recover(condvar, lock_recover(flag), |ready| !*ready);
        assert!(*guard);
        drop(guard);
        handle.join().unwrap();
    }
}
