use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use super::queue::{Origin, QueueSet, ThreadQueue};
use super::{
    INITIAL_LEVEL, MAIN_THREAD_NAME, Scheduler, SchedulerKind, SharedRenderer, ThreadRegistration,
    implicit_thread_name,
};
use crate::message::RawMessage;
use crate::renderer::RenderContext;
use crate::sync::{lock_recover, lock_recover_debug, wait_while_recover};

/// Name of the background consumer thread.
pub const CONSUMER_THREAD_NAME: &str = "conclog-consumer";

#[derive(Debug, Default)]
struct QueueState {
    queues: QueueSet,
    terminating: bool,
}

impl QueueState {
    /// The consumer may stop once nothing is pending and no registered
    /// producer can enqueue more.
    fn is_finished(&self) -> bool {
        self.terminating && !self.queues.has_active_producers() && self.queues.all_empty()
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    renderer: SharedRenderer,
}

impl Shared {
    fn consume(&self) {
        tracing::debug!(target: "conclog::consumer", "consumer thread started");
        loop {
            let (msg, ctx) = {
                let guard = lock_recover_debug(&self.state, "NonblockingScheduler::consume");
                let mut state = wait_while_recover(&self.available, guard, |s| {
                    s.queues.all_empty()
                        && !(s.terminating && !s.queues.has_active_producers())
                });
                if state.is_finished() {
                    state.queues.prune();
                    break;
                }
                let Some(msg) = state.queues.dequeue_busiest() else {
                    continue;
                };
                state.queues.prune();
                (msg, RenderContext::named(state.queues.largest_name_width()))
            };
            lock_recover(&self.renderer).submit(&msg, ctx);
        }
        tracing::debug!(target: "conclog::consumer", "consumer thread drained and stopped");
    }

    /// Enqueue a message built from the caller's entry and wake the consumer.
    fn enqueue(&self, build: impl FnOnce(&ThreadQueue) -> RawMessage) {
        let mut state = lock_recover(&self.state);
        let queue = state
            .queues
            .entry(thread::current().id(), implicit_thread_name);
        let msg = build(queue);
        queue.push(msg);
        state.queues.prune();
        drop(state);
        self.available.notify_one();
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut ThreadQueue) -> R) -> R {
        let mut state = lock_recover(&self.state);
        f(state.queues.entry(thread::current().id(), implicit_thread_name))
    }
}

/// Enqueues messages per thread; a dedicated consumer thread renders them.
///
/// Producers never wait for rendering. Messages of one thread are rendered
/// in submission order; across threads, the queue with the most pending
/// messages is drained first.
#[derive(Debug)]
pub struct NonblockingScheduler {
    shared: Arc<Shared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl NonblockingScheduler {
    /// Create the scheduler, registering the calling thread as `main`, and
    /// start the consumer thread.
    ///
    /// # Errors
    ///
    /// Returns the error from spawning the consumer thread.
    pub fn new(renderer: SharedRenderer) -> io::Result<Self> {
        let mut state = QueueState::default();
        state.queues.insert(ThreadQueue::new(
            thread::current().id(),
            MAIN_THREAD_NAME.to_string(),
            INITIAL_LEVEL,
            Origin::Main,
        ));
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            available: Condvar::new(),
            renderer,
        });

        let consumer_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_string())
            .spawn(move || consumer_shared.consume())?;

        Ok(Self {
            shared,
            consumer: Mutex::new(Some(handle)),
        })
    }
}

impl Scheduler for NonblockingScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Nonblocking
    }

    fn println(&self, level_increase: u32, text: String) {
        self.shared.enqueue(|q| {
            RawMessage::println(&q.name, q.level.saturating_add(level_increase), text)
        });
    }

    fn hold(&self, scope: String, text: String) {
        self.shared
            .enqueue(|q| RawMessage::hold(&q.name, scope, q.level, text));
    }

    fn release(&self, scope: String) {
        self.shared
            .enqueue(|q| RawMessage::release(&q.name, scope, q.level));
    }

    fn current_level(&self) -> u32 {
        self.shared.with_current(|q| q.level)
    }

    fn current_thread_name(&self) -> String {
        self.shared.with_current(|q| q.name.clone())
    }

    fn largest_thread_name_width(&self) -> usize {
        lock_recover(&self.shared.state).queues.largest_name_width()
    }

    fn increase_level(&self, by: u32) {
        self.shared
            .with_current(|q| q.level = q.level.saturating_add(by));
    }

    fn decrease_level(&self, by: u32) {
        self.shared
            .with_current(|q| q.level = q.level.saturating_sub(by));
    }

    /// Signal termination and block until the consumer has drained every
    /// queue and no registered producer remains.
    fn terminate(&self) {
        lock_recover(&self.shared.state).terminating = true;
        self.shared.available.notify_all();

        let handle = lock_recover(&self.consumer).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(target: "conclog::consumer", "consumer thread panicked");
            }
        }
    }

    fn thread_registration(&self) -> Option<&dyn ThreadRegistration> {
        Some(self)
    }
}

impl ThreadRegistration for NonblockingScheduler {
    fn register(&self, id: ThreadId, name: String, level: Option<u32>) {
        let level = level.unwrap_or_else(|| self.current_level());
        let mut state = lock_recover(&self.shared.state);
        match state.queues.get_mut(id) {
            Some(queue) if queue.alive && queue.origin != Origin::Implicit => {}
            Some(queue) => queue.promote(name, level),
            None => state
                .queues
                .insert(ThreadQueue::new(id, name, level, Origin::Registered)),
        }
        tracing::debug!(target: "conclog::scheduler", ?id, "thread registered (nonblocking)");
    }

    fn unregister(&self, id: ThreadId) {
        let mut state = lock_recover(&self.shared.state);
        if let Some(queue) = state.queues.get_mut(id) {
            queue.alive = false;
        }
        state.queues.prune();
        drop(state);
        self.shared.available.notify_all();
        tracing::debug!(target: "conclog::scheduler", ?id, "thread unregistered (nonblocking)");
    }
}

impl Drop for NonblockingScheduler {
    fn drop(&mut self) {
        self.terminate();
    }
}
