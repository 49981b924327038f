use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use super::{INITIAL_LEVEL, Scheduler, SchedulerKind, SharedRenderer};
use crate::message::RawMessage;
use crate::renderer::RenderContext;
use crate::sync::lock_recover;

/// Renders on the calling thread with a single process-wide level.
///
/// Intended for single-threaded programs: concurrent callers share one level
/// and their output may interleave at line granularity.
#[derive(Debug)]
pub struct ImmediateScheduler {
    level: AtomicU32,
    renderer: SharedRenderer,
}

impl ImmediateScheduler {
    #[must_use]
    pub fn new(renderer: SharedRenderer) -> Self {
        Self {
            level: AtomicU32::new(INITIAL_LEVEL),
            renderer,
        }
    }

    fn render(&self, msg: &RawMessage) {
        lock_recover(&self.renderer).submit(msg, RenderContext::anonymous());
    }
}

impl Scheduler for ImmediateScheduler {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Immediate
    }

    fn println(&self, level_increase: u32, text: String) {
        let level = self.current_level().saturating_add(level_increase);
        self.render(&RawMessage::println(self.current_thread_name(), level, text));
    }

    fn hold(&self, scope: String, text: String) {
        let msg = RawMessage::hold(self.current_thread_name(), scope, self.current_level(), text);
        self.render(&msg);
    }

    fn release(&self, scope: String) {
        let msg = RawMessage::release(self.current_thread_name(), scope, self.current_level());
        self.render(&msg);
    }

    fn current_level(&self) -> u32 {
        self.level.load(Ordering::Relaxed)
    }

    fn current_thread_name(&self) -> String {
        format!("{:?}", thread::current().id())
    }

    fn largest_thread_name_width(&self) -> usize {
        self.current_thread_name().len()
    }

    fn increase_level(&self, by: u32) {
        let _ = self
            .level
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |l| Some(l.saturating_add(by)));
    }

    fn decrease_level(&self, by: u32) {
        let _ = self
            .level
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |l| Some(l.saturating_sub(by)));
    }

    fn terminate(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggerConfiguration, ThreadNamePolicy};
    use crate::output::{CaptureBuffer, OutputSink};
    use crate::renderer::Renderer;
    use std::sync::{Arc, Mutex};

    fn scheduler() -> (ImmediateScheduler, CaptureBuffer) {
        let buffer = CaptureBuffer::new();
        let config = LoggerConfiguration::default()
            .with_verbosity(3)
            .with_thread_name_policy(ThreadNamePolicy::Before);
        let mut renderer = Renderer::new(config);
        renderer.replace_sink(OutputSink::Capture(buffer.clone()));
        renderer.set_window_columns(Some(80));
        (ImmediateScheduler::new(Arc::new(Mutex::new(renderer))), buffer)
    }

    #[test]
    fn test_levels() {
        let (s, _) = scheduler();
        assert_eq!(s.current_level(), 1);
        s.increase_level(2);
        assert_eq!(s.current_level(), 3);
        s.decrease_level(5);
        assert_eq!(s.current_level(), 0);
        assert!(s.thread_registration().is_none());
    }

    #[test]
    fn test_renders_inline_without_thread_names() {
        let (s, buf) = scheduler();
        s.println(0, "one".to_string());
        s.println(1, "two".to_string());
        assert_eq!(buf.contents(), "1| one\n2|  two\n");
    }

    #[test]
    fn test_hold_and_release() {
        let (s, buf) = scheduler();
        s.hold("scope".to_string(), "busy".to_string());
        s.release("scope".to_string());
        assert_eq!(buf.contents(), "\r1| busy \r        \r");
    }
}
