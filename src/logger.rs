//! The logger handle.
//!
//! [`Logger`] is a cheap, cloneable handle over shared state: the renderer,
//! the installed scheduler and the attached thread registry. Producers on
//! any thread call into the handle; the scheduler decides how their messages
//! reach the renderer.
//!
//! # Example
//!
//! ```rust
//! use conclog::Logger;
//!
//! let logger = Logger::new();
//! let output = logger.capture();
//! logger.set_verbosity(2);
//! logger.set_window_columns(Some(80));
//!
//! logger.println(0, "starting");
//! {
//!     let scope = logger.scope("solve");
//!     scope.hold("50%");
//!     logger.println(0, "halfway");
//! }
//! logger.println(0, "done");
//! logger.shutdown();
//!
//! assert!(output.contents().contains("1| starting\n"));
//! assert!(output.contents().contains("2|  halfway"));
//! ```

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock};
use std::thread::{self, ThreadId};

use crate::config::{LoggerConfiguration, ThreadNamePolicy};
use crate::error::{LoggerError, Result};
use crate::output::{CaptureBuffer, OutputSink};
use crate::registry::ThreadRegistry;
use crate::renderer::Renderer;
use crate::scheduler::{
    BlockingScheduler, ImmediateScheduler, NonblockingScheduler, Scheduler, SchedulerKind,
    SharedRenderer,
};
use crate::scope::{LevelGuard, ScopeGuard};
use crate::style::TextStyle;
use crate::sync::{lock_recover, read_recover, write_recover};
use crate::theme::Theme;

/// Level offset applied by [`Logger::mute_increase_level`].
pub const MUTE_LEVEL_OFFSET: u32 = 1024;

struct LoggerInner {
    renderer: SharedRenderer,
    scheduler: RwLock<Arc<dyn Scheduler>>,
    registry: Mutex<Option<Arc<dyn ThreadRegistry>>>,
    /// Mirror of the configured verbosity, readable without the renderer lock.
    verbosity: AtomicU32,
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        read_recover(&self.scheduler).terminate();
    }
}

/// Handle to a logging engine.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("scheduler", &self.scheduler_kind())
            .field("verbosity", &self.verbosity())
            .field("registry_attached", &self.has_thread_registry_attached())
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// A logger with the default configuration, writing to standard error
    /// through a blocking scheduler. The calling thread becomes `main`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_configuration(LoggerConfiguration::default())
    }

    #[must_use]
    pub fn with_configuration(config: LoggerConfiguration) -> Self {
        let verbosity = AtomicU32::new(config.verbosity());
        let renderer = Arc::new(Mutex::new(Renderer::new(config)));
        let scheduler: Arc<dyn Scheduler> = Arc::new(BlockingScheduler::new(Arc::clone(&renderer)));
        Self {
            inner: Arc::new(LoggerInner {
                renderer,
                scheduler: RwLock::new(scheduler),
                registry: Mutex::new(None),
                verbosity,
            }),
        }
    }

    /// The process-wide logger, configured from the environment on first use.
    pub fn instance() -> &'static Logger {
        static INSTANCE: LazyLock<Logger> =
            LazyLock::new(|| Logger::with_configuration(LoggerConfiguration::from_env()));
        &INSTANCE
    }

    fn scheduler(&self) -> Arc<dyn Scheduler> {
        Arc::clone(&read_recover(&self.inner.scheduler))
    }

    fn renderer(&self) -> std::sync::MutexGuard<'_, Renderer> {
        lock_recover(&self.inner.renderer)
    }

    // Registry and scheduler management

    /// Attach the registry consulted before scheduler switches.
    ///
    /// # Errors
    ///
    /// [`LoggerError::DuplicateRegistryAttachment`] if one is already attached.
    pub fn attach_thread_registry(&self, registry: Arc<dyn ThreadRegistry>) -> Result<()> {
        let mut slot = lock_recover(&self.inner.registry);
        if slot.is_some() {
            return Err(LoggerError::DuplicateRegistryAttachment);
        }
        *slot = Some(registry);
        Ok(())
    }

    #[must_use]
    pub fn has_thread_registry_attached(&self) -> bool {
        lock_recover(&self.inner.registry).is_some()
    }

    fn require_registry(&self) -> Result<Arc<dyn ThreadRegistry>> {
        lock_recover(&self.inner.registry)
            .clone()
            .ok_or(LoggerError::MissingRegistry)
    }

    /// # Errors
    ///
    /// See [`Logger::use_blocking_scheduler`].
    pub fn use_immediate_scheduler(&self) -> Result<()> {
        self.switch_scheduler(SchedulerKind::Immediate)
    }

    /// Install a blocking scheduler, terminating the current one.
    ///
    /// # Errors
    ///
    /// [`LoggerError::MissingRegistry`] without an attached registry,
    /// [`LoggerError::UnsafeSchedulerSwitch`] while it reports registered
    /// threads.
    pub fn use_blocking_scheduler(&self) -> Result<()> {
        self.switch_scheduler(SchedulerKind::Blocking)
    }

    /// # Errors
    ///
    /// See [`Logger::use_blocking_scheduler`]; additionally
    /// [`LoggerError::Spawn`] if the consumer thread cannot be started.
    pub fn use_nonblocking_scheduler(&self) -> Result<()> {
        self.switch_scheduler(SchedulerKind::Nonblocking)
    }

    fn build_scheduler(&self, kind: SchedulerKind) -> Result<Arc<dyn Scheduler>> {
        let renderer = Arc::clone(&self.inner.renderer);
        Ok(match kind {
            SchedulerKind::Immediate => Arc::new(ImmediateScheduler::new(renderer)),
            SchedulerKind::Blocking => Arc::new(BlockingScheduler::new(renderer)),
            SchedulerKind::Nonblocking => {
                Arc::new(NonblockingScheduler::new(renderer).map_err(LoggerError::Spawn)?)
            }
        })
    }

    fn switch_scheduler(&self, kind: SchedulerKind) -> Result<()> {
        let registry = self.require_registry()?;
        if registry.has_threads_registered() {
            return Err(LoggerError::UnsafeSchedulerSwitch);
        }
        let replacement = self.build_scheduler(kind)?;
        let previous = std::mem::replace(&mut *write_recover(&self.inner.scheduler), replacement);
        previous.terminate();
        tracing::debug!(
            target: "conclog::scheduler",
            from = %previous.kind(),
            to = %kind,
            "scheduler switched"
        );
        Ok(())
    }

    #[must_use]
    pub fn scheduler_kind(&self) -> SchedulerKind {
        read_recover(&self.inner.scheduler).kind()
    }

    /// Register thread `id` under `name` at the caller's current level.
    ///
    /// A no-op for the immediate scheduler.
    ///
    /// # Errors
    ///
    /// [`LoggerError::MissingRegistry`] without an attached registry.
    pub fn register_thread(&self, id: ThreadId, name: impl Into<String>) -> Result<()> {
        self.require_registry()?;
        if let Some(registration) = self.scheduler().thread_registration() {
            registration.register(id, name.into(), None);
        }
        Ok(())
    }

    /// Register the calling thread under `name` at `level`.
    ///
    /// # Errors
    ///
    /// [`LoggerError::MissingRegistry`] without an attached registry.
    pub fn register_self_thread(&self, name: impl Into<String>, level: u32) -> Result<()> {
        self.require_registry()?;
        if let Some(registration) = self.scheduler().thread_registration() {
            registration.register(thread::current().id(), name.into(), Some(level));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`LoggerError::MissingRegistry`] without an attached registry.
    pub fn unregister_thread(&self, id: ThreadId) -> Result<()> {
        self.require_registry()?;
        if let Some(registration) = self.scheduler().thread_registration() {
            registration.unregister(id);
        }
        Ok(())
    }

    // Logging surface

    /// Emit a line at the caller's level plus `level_increase`.
    pub fn println(&self, level_increase: u32, text: impl Into<String>) {
        let scheduler = self.scheduler();
        if self.verbosity() < scheduler.current_level().saturating_add(level_increase) {
            return;
        }
        scheduler.println(level_increase, text.into());
    }

    /// Set the held line of `scope`.
    pub fn hold(&self, scope: impl Into<String>, text: impl Into<String>) {
        let scheduler = self.scheduler();
        if self.verbosity() < scheduler.current_level() {
            return;
        }
        scheduler.hold(scope.into(), text.into());
    }

    /// Release the held line of `scope`; unknown scopes are ignored.
    pub fn release(&self, scope: impl Into<String>) {
        self.scheduler().release(scope.into());
    }

    pub fn increase_level(&self, by: u32) {
        self.scheduler().increase_level(by);
    }

    pub fn decrease_level(&self, by: u32) {
        self.scheduler().decrease_level(by);
    }

    /// Shift the caller's level far beyond any sensible verbosity.
    pub fn mute_increase_level(&self) {
        self.increase_level(MUTE_LEVEL_OFFSET);
    }

    pub fn mute_decrease_level(&self) {
        self.decrease_level(MUTE_LEVEL_OFFSET);
    }

    /// True if a line `level_increase` above the caller's level is suppressed.
    #[must_use]
    pub fn is_muted_at(&self, level_increase: u32) -> bool {
        self.verbosity() < self.current_level().saturating_add(level_increase)
    }

    #[must_use]
    pub fn current_level(&self) -> u32 {
        self.scheduler().current_level()
    }

    #[must_use]
    pub fn current_thread_name(&self) -> String {
        self.scheduler().current_thread_name()
    }

    #[must_use]
    pub fn largest_thread_name_width(&self) -> usize {
        self.scheduler().largest_thread_name_width()
    }

    /// Thread name of the last rendered permanent line.
    #[must_use]
    pub fn last_printed_thread_name(&self) -> String {
        self.renderer().last_printed_thread_name().to_string()
    }

    /// Open a scope one level deeper; see [`ScopeGuard`].
    #[must_use]
    pub fn scope(&self, name: impl Into<String>) -> ScopeGuard {
        ScopeGuard::new(self.clone(), name.into(), 1)
    }

    #[must_use]
    pub fn scope_at(&self, name: impl Into<String>, level_increase: u32) -> ScopeGuard {
        ScopeGuard::new(self.clone(), name.into(), level_increase)
    }

    /// Run `f` with the caller's level raised by `level_increase`.
    pub fn run_at<R>(&self, level_increase: u32, f: impl FnOnce() -> R) -> R {
        let _guard = LevelGuard::new(self.clone(), level_increase);
        f()
    }

    /// Run `f` with everything it logs suppressed.
    pub fn run_muted<R>(&self, f: impl FnOnce() -> R) -> R {
        self.run_at(MUTE_LEVEL_OFFSET, f)
    }

    // Configuration

    /// A snapshot of the current configuration.
    #[must_use]
    pub fn configuration(&self) -> LoggerConfiguration {
        self.renderer().config().clone()
    }

    /// Modify the configuration in place.
    pub fn configure(&self, f: impl FnOnce(&mut LoggerConfiguration)) {
        let mut renderer = self.renderer();
        f(renderer.config_mut());
        self.inner
            .verbosity
            .store(renderer.config().verbosity(), Ordering::Relaxed);
    }

    /// Replace the whole configuration.
    pub fn set_configuration(&self, config: LoggerConfiguration) {
        self.configure(|current| *current = config);
    }

    #[must_use]
    pub fn verbosity(&self) -> u32 {
        self.inner.verbosity.load(Ordering::Relaxed)
    }

    pub fn set_verbosity(&self, verbosity: u32) {
        self.configure(|c| c.set_verbosity(verbosity));
    }

    pub fn set_theme(&self, theme: Theme) {
        self.configure(|c| c.set_theme(theme));
    }

    pub fn set_thread_name_policy(&self, policy: ThreadNamePolicy) {
        self.configure(|c| c.set_thread_name_policy(policy));
    }

    pub fn set_indents_based_on_level(&self, enabled: bool) {
        self.configure(|c| c.set_indents_based_on_level(enabled));
    }

    pub fn set_prints_level_on_change_only(&self, enabled: bool) {
        self.configure(|c| c.set_prints_level_on_change_only(enabled));
    }

    pub fn set_prints_scope_entrance(&self, enabled: bool) {
        self.configure(|c| c.set_prints_scope_entrance(enabled));
    }

    pub fn set_prints_scope_exit(&self, enabled: bool) {
        self.configure(|c| c.set_prints_scope_exit(enabled));
    }

    pub fn set_handles_multiline_output(&self, enabled: bool) {
        self.configure(|c| c.set_handles_multiline_output(enabled));
    }

    pub fn set_discards_newlines_and_indentation(&self, enabled: bool) {
        self.configure(|c| c.set_discards_newlines_and_indentation(enabled));
    }

    /// Highlight `keyword` with the keyword style of the current theme.
    ///
    /// Returns false if the keyword already exists.
    pub fn add_custom_keyword(&self, keyword: impl Into<String>) -> bool {
        let mut added = false;
        self.configure(|c| added = c.add_custom_keyword(keyword));
        added
    }

    /// Highlight `keyword` with `style`.
    pub fn add_custom_keyword_styled(&self, keyword: impl Into<String>, style: TextStyle) -> bool {
        let mut added = false;
        self.configure(|c| added = c.add_custom_keyword_styled(keyword, style));
        added
    }

    // Output

    /// Width used for wrapping: the override if set, else the terminal's.
    #[must_use]
    pub fn window_columns(&self) -> usize {
        self.renderer().window_columns()
    }

    pub fn set_window_columns(&self, columns: Option<usize>) {
        self.renderer().set_window_columns(columns);
    }

    /// Write all further output to `path`, truncating it.
    ///
    /// # Errors
    ///
    /// [`LoggerError::Io`] if the file cannot be created; output is unchanged.
    pub fn redirect_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let sink = OutputSink::file(path).map_err(|err| LoggerError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        drop(self.renderer().replace_sink(sink));
        tracing::debug!(target: "conclog::output", path = %path.display(), "output redirected to file");
        Ok(())
    }

    /// Write all further output to standard error, closing any file.
    pub fn redirect_to_console(&self) {
        drop(self.renderer().replace_sink(OutputSink::Stderr));
        tracing::debug!(target: "conclog::output", "output redirected to console");
    }

    /// Write all further output into memory and return a handle to it.
    #[must_use]
    pub fn capture(&self) -> CaptureBuffer {
        let buffer = CaptureBuffer::new();
        drop(self.renderer().replace_sink(OutputSink::Capture(buffer.clone())));
        buffer
    }

    // Lifecycle

    /// Drain and stop the current scheduler, then fall back to a blocking one.
    ///
    /// The scheduler stays installed while it drains, so registered threads
    /// still running can keep logging and unregister through it.
    pub fn shutdown(&self) {
        let current = self.scheduler();
        current.terminate();
        let replacement: Arc<dyn Scheduler> =
            Arc::new(BlockingScheduler::new(Arc::clone(&self.inner.renderer)));
        let previous = std::mem::replace(&mut *write_recover(&self.inner.scheduler), replacement);
        // A no-op unless another switch installed a scheduler meanwhile.
        previous.terminate();
        if let Err(err) = self.renderer().flush() {
            tracing::warn!(target: "conclog::output", %err, "failed to flush output on shutdown");
        }
        tracing::debug!(target: "conclog::scheduler", from = %previous.kind(), "logger shut down");
    }

    /// Restore defaults: configuration, blocking scheduler, standard error,
    /// detected width, no registry, no held lines.
    pub fn reset(&self) {
        self.shutdown();
        *lock_recover(&self.inner.registry) = None;
        let mut renderer = self.renderer();
        drop(renderer.replace_sink(OutputSink::Stderr));
        renderer.set_window_columns(None);
        renderer.reset_state();
        *renderer.config_mut() = LoggerConfiguration::default();
        self.inner
            .verbosity
            .store(renderer.config().verbosity(), Ordering::Relaxed);
    }
}
