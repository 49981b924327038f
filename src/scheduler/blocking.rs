use std::collections::HashMap;
use std::sync::{Mutex, Weak};
use std::thread::{self, ThreadId};

use super::{
    INITIAL_LEVEL, MAIN_THREAD_NAME, Scheduler, SchedulerKind, SharedRenderer, ThreadRegistration,
    has_exited, implicit_thread_name, liveness_token,
};
use crate::cells::cell_len;
use crate::message::RawMessage;
use crate::renderer::RenderContext;
use crate::sync::{lock_recover, lock_recover_debug};

#[derive(Debug, Clone)]
struct ThreadEntry {
    name: String,
    level: u32,
    /// Set while the entry is implicit; expires with its thread.
    liveness: Option<Weak<()>>,
}

impl ThreadEntry {
    fn registered(name: String, level: u32) -> Self {
        Self {
            name,
            level,
            liveness: None,
        }
    }

    fn is_implicit(&self) -> bool {
        self.liveness.is_some()
    }

    fn is_stale(&self) -> bool {
        self.liveness.as_ref().is_some_and(has_exited)
    }
}

/// Renders on the calling thread while holding the scheduler lock.
///
/// Output order equals call order across all threads; producers wait for
/// each other's rendering.
#[derive(Debug)]
pub struct BlockingScheduler {
    threads: Mutex<HashMap<ThreadId, ThreadEntry>>,
    renderer: SharedRenderer,
}

impl BlockingScheduler {
    /// Create the scheduler, registering the calling thread as `main`.
    #[must_use]
    pub fn new(renderer: SharedRenderer) -> Self {
        let mut threads = HashMap::new();
        threads.insert(
            thread::current().id(),
            ThreadEntry::registered(MAIN_THREAD_NAME.to_string(), INITIAL_LEVEL),
        );
        Self {
            threads: Mutex::new(threads),
            renderer,
        }
    }

    /// Run `f` on the caller's entry while the scheduler lock is held.
    fn with_current<R>(
        &self,
        f: impl FnOnce(&mut ThreadEntry, &HashMap<ThreadId, ThreadEntry>) -> R,
    ) -> R {
        let mut threads = lock_recover_debug(&self.threads, "BlockingScheduler");
        threads.retain(|_, entry| !entry.is_stale());
        let id = thread::current().id();
        let mut entry = threads.remove(&id).unwrap_or_else(|| ThreadEntry {
            name: implicit_thread_name(),
            level: INITIAL_LEVEL,
            liveness: Some(liveness_token()),
        });
        let result = f(&mut entry, &threads);
        threads.insert(id, entry);
        result
    }

    fn render_for_current(&self, build: impl FnOnce(&ThreadEntry) -> RawMessage) {
        self.with_current(|entry, others| {
            let name_width = others
                .values()
                .map(|e| cell_len(&e.name))
                .chain(std::iter::once(cell_len(&entry.name)))
                .max()
                .unwrap_or(0);
            let msg = build(entry);
            lock_recover(&self.renderer).submit(&msg, RenderContext::named(name_width));
        });
    }
}

impl Scheduler for BlockingScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Blocking
    }

    fn println(&self, level_increase: u32, text: String) {
        self.render_for_current(|entry| {
            RawMessage::println(&entry.name, entry.level.saturating_add(level_increase), text)
        });
    }

    fn hold(&self, scope: String, text: String) {
        self.render_for_current(|entry| RawMessage::hold(&entry.name, scope, entry.level, text));
    }

    fn release(&self, scope: String) {
        self.render_for_current(|entry| RawMessage::release(&entry.name, scope, entry.level));
    }

    fn current_level(&self) -> u32 {
        self.with_current(|entry, _| entry.level)
    }

    fn current_thread_name(&self) -> String {
        self.with_current(|entry, _| entry.name.clone())
    }

    fn largest_thread_name_width(&self) -> usize {
        lock_recover(&self.threads)
            .values()
            .filter(|e| !e.is_stale())
            .map(|e| cell_len(&e.name))
            .max()
            .unwrap_or(0)
    }

    fn increase_level(&self, by: u32) {
        self.with_current(|entry, _| entry.level = entry.level.saturating_add(by));
    }

    fn decrease_level(&self, by: u32) {
        self.with_current(|entry, _| entry.level = entry.level.saturating_sub(by));
    }

    fn terminate(&self) {}

    fn thread_registration(&self) -> Option<&dyn ThreadRegistration> {
        Some(self)
    }
}

impl ThreadRegistration for BlockingScheduler {
    fn register(&self, id: ThreadId, name: String, level: Option<u32>) {
        let level = level.unwrap_or_else(|| self.current_level());
        let mut threads = lock_recover(&self.threads);
        match threads.get_mut(&id) {
            Some(entry) if !entry.is_implicit() => {}
            Some(entry) => *entry = ThreadEntry::registered(name, level),
            None => {
                threads.insert(id, ThreadEntry::registered(name, level));
            }
        }
        tracing::debug!(target: "conclog::scheduler", ?id, "thread registered (blocking)");
    }

    fn unregister(&self, id: ThreadId) {
        lock_recover(&self.threads).remove(&id);
        tracing::debug!(target: "conclog::scheduler", ?id, "thread unregistered (blocking)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggerConfiguration, ThreadNamePolicy};
    use crate::output::{CaptureBuffer, OutputSink};
    use crate::renderer::Renderer;
    use std::sync::{Arc, Mutex, mpsc};

    fn scheduler(policy: ThreadNamePolicy) -> (Arc<BlockingScheduler>, CaptureBuffer) {
        let buffer = CaptureBuffer::new();
        let config = LoggerConfiguration::default()
            .with_verbosity(5)
            .with_thread_name_policy(policy);
        let mut renderer = Renderer::new(config);
        renderer.replace_sink(OutputSink::Capture(buffer.clone()));
        renderer.set_window_columns(Some(80));
        let renderer = Arc::new(Mutex::new(renderer));
        (Arc::new(BlockingScheduler::new(renderer)), buffer)
    }

    #[test]
    fn test_creator_is_main() {
        let (s, _) = scheduler(ThreadNamePolicy::Never);
        assert_eq!(s.current_thread_name(), "main");
        assert_eq!(s.current_level(), 1);
        assert_eq!(s.largest_thread_name_width(), 4);
    }

    #[test]
    fn test_register_keeps_existing_entry() {
        let (s, _) = scheduler(ThreadNamePolicy::Never);
        let registration = s.thread_registration().unwrap();
        registration.register(thread::current().id(), "renamed".to_string(), Some(7));
        assert_eq!(s.current_thread_name(), "main");
        assert_eq!(s.current_level(), 1);
    }

    #[test]
    fn test_registered_thread_inherits_caller_level() {
        let (s, _) = scheduler(ThreadNamePolicy::Never);
        s.increase_level(1);
        let (go, wait) = mpsc::channel::<()>();
        let worker = Arc::clone(&s);
        let handle = thread::spawn(move || {
            wait.recv().unwrap();
            (worker.current_thread_name(), worker.current_level())
        });
        s.thread_registration()
            .unwrap()
            .register(handle.thread().id(), "worker".to_string(), None);
        go.send(()).unwrap();
        assert_eq!(handle.join().unwrap(), ("worker".to_string(), 2));
        assert_eq!(s.largest_thread_name_width(), 6);
    }

    #[test]
    fn test_unknown_thread_gets_implicit_entry() {
        let (s, buf) = scheduler(ThreadNamePolicy::Never);
        let worker = Arc::clone(&s);
        let (name, level) = thread::Builder::new()
            .name("solver".to_string())
            .spawn(move || {
                worker.println(0, "from solver".to_string());
                (worker.current_thread_name(), worker.current_level())
            })
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name, "solver");
        assert_eq!(level, 1);
        assert_eq!(buf.contents(), "1| from solver\n");
    }

    #[test]
    fn test_finished_unregistered_threads_are_forgotten() {
        let (s, buf) = scheduler(ThreadNamePolicy::Never);
        for t in 0..200 {
            let s = Arc::clone(&s);
            thread::Builder::new()
                .name(format!("short_lived_{t}"))
                .spawn(move || s.println(0, format!("hello {t}")))
                .unwrap()
                .join()
                .unwrap();
        }
        assert_eq!(s.largest_thread_name_width(), 4);
        s.println(0, "from main".to_string());

        assert_eq!(buf.contents().lines().count(), 201);
        assert_eq!(lock_recover(&s.threads).len(), 1);
    }

    #[test]
    fn test_unregister_removes_entry() {
        let (s, _) = scheduler(ThreadNamePolicy::Never);
        let id = thread::spawn(|| thread::current().id()).join().unwrap();
        let registration = s.thread_registration().unwrap();
        registration.register(id, "a_long_worker_name".to_string(), Some(1));
        assert_eq!(s.largest_thread_name_width(), 18);
        registration.unregister(id);
        assert_eq!(s.largest_thread_name_width(), 4);
    }

    #[test]
    fn test_thread_name_column_is_rendered() {
        let (s, buf) = scheduler(ThreadNamePolicy::Before);
        s.println(0, "hello".to_string());
        assert_eq!(buf.contents(), "main@1| hello\n");
    }

    #[test]
    fn test_per_thread_order_is_preserved() {
        let (s, buf) = scheduler(ThreadNamePolicy::Never);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for i in 0..25 {
                        s.println(0, format!("t{t} m{i:02}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let output = buf.contents();
        assert_eq!(output.lines().count(), 100);
        for t in 0..4 {
            let tag = format!("t{t} ");
            let seen: Vec<&str> = output
                .lines()
                .filter_map(|line| line.split_once(&tag).map(|(_, rest)| rest))
                .collect();
            let expected: Vec<String> = (0..25).map(|i| format!("m{i:02}")).collect();
            assert_eq!(seen, expected);
        }
    }
}
