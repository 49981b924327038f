//! Threads that register themselves with a logger.

use std::any::Any;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use crate::error::{LoggerError, Result};
use crate::logger::Logger;
use crate::registry::ThreadCounter;

/// A thread registered with a [`Logger`] for as long as it runs.
///
/// The task does not start before the thread is registered, so its first
/// message already carries the thread's name and inherits the level of the
/// spawning thread. Joining, or dropping the handle, waits for the task,
/// unregisters the thread and decrements the counter.
///
/// ```rust
/// use std::sync::Arc;
/// use conclog::{Logger, LoggedThread, ThreadCounter};
///
/// let logger = Logger::new();
/// let counter = Arc::new(ThreadCounter::new());
/// logger.attach_thread_registry(counter.clone()).unwrap();
///
/// let worker = LoggedThread::spawn(&logger, &counter, Some("worker"), {
///     let logger = logger.clone();
///     move || logger.current_thread_name()
/// })
/// .unwrap();
/// assert_eq!(worker.join().unwrap(), "worker");
/// assert_eq!(counter.count(), 0);
/// ```
#[derive(Debug)]
pub struct LoggedThread<T> {
    handle: Option<JoinHandle<T>>,
    id: ThreadId,
    name: String,
    logger: Logger,
    counter: Arc<ThreadCounter>,
}

impl<T: Send + 'static> LoggedThread<T> {
    /// Spawn `task` on a new thread named `name` (the thread id if `None`).
    ///
    /// # Errors
    ///
    /// [`LoggerError::MissingRegistry`] if `logger` has no registry attached,
    /// [`LoggerError::Spawn`] if the thread cannot be created.
    pub fn spawn<F>(
        logger: &Logger,
        counter: &Arc<ThreadCounter>,
        name: Option<&str>,
        task: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if !logger.has_thread_registry_attached() {
            return Err(LoggerError::MissingRegistry);
        }

        let (go, wait) = mpsc::channel::<()>();
        let mut builder = thread::Builder::new();
        if let Some(name) = name {
            builder = builder.name(name.to_string());
        }
        let handle = builder
            .spawn(move || {
                let _ = wait.recv();
                task()
            })
            .map_err(LoggerError::Spawn)?;

        let id = handle.thread().id();
        let name = name.map_or_else(|| format!("{id:?}"), str::to_string);
        counter.increment();
        let registered = logger.register_thread(id, name.clone());
        let _ = go.send(());
        if let Err(err) = registered {
            counter.decrement();
            return Err(err);
        }

        Ok(Self {
            handle: Some(handle),
            id,
            name,
            logger: logger.clone(),
            counter: Arc::clone(counter),
        })
    }

    /// Wait for the task and unregister the thread.
    ///
    /// # Errors
    ///
    /// The panic payload if the task panicked.
    pub fn join(mut self) -> thread::Result<T> {
        match self.finish() {
            Some(result) => result,
            None => Err(Box::new("thread already joined") as Box<dyn Any + Send>),
        }
    }
}

impl<T> LoggedThread<T> {
    #[must_use]
    pub const fn id(&self) -> ThreadId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn finish(&mut self) -> Option<thread::Result<T>> {
        let handle = self.handle.take()?;
        let result = handle.join();
        if let Err(err) = self.logger.unregister_thread(self.id) {
            tracing::debug!(target: "conclog::scheduler", %err, name = %self.name, "unregister skipped");
        }
        self.counter.decrement();
        Some(result)
    }
}

impl<T> Drop for LoggedThread<T> {
    fn drop(&mut self) {
        if let Some(Err(_)) = self.finish() {
            tracing::warn!(target: "conclog::scheduler", name = %self.name, "logged thread panicked");
        }
    }
}
