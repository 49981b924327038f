//! Bridges from the `log` and `tracing` facades into a [`Logger`].
//!
//! Records are printed at the calling thread's level plus an offset derived
//! from their severity: error and warn at +0, info at +1, debug at +2 and
//! trace at +3. Records whose target starts with `conclog` are dropped so
//! the engine's own diagnostics never loop back into it.
//!
//! The tracing layer is available as `ConcLogLayer` when the
//! `tracing-layer` feature is enabled.

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::logger::Logger;

const INTERNAL_TARGET: &str = "conclog";

/// Level offset of a record of `level`.
#[must_use]
pub const fn level_offset(level: Level) -> u32 {
    match level {
        Level::Error | Level::Warn => 0,
        Level::Info => 1,
        Level::Debug => 2,
        Level::Trace => 3,
    }
}

fn is_internal(target: &str) -> bool {
    target.starts_with(INTERNAL_TARGET)
}

/// `log::Log` implementation printing through a [`Logger`].
#[derive(Debug, Clone)]
pub struct LogBridge {
    logger: Logger,
    level: LevelFilter,
    target_prefix: Option<String>,
    show_target: bool,
}

impl LogBridge {
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LevelFilter::Trace,
            target_prefix: None,
            show_target: false,
        }
    }

    /// Bridge into the process-wide logger.
    #[must_use]
    pub fn global() -> Self {
        Self::new(Logger::instance().clone())
    }

    /// Set the most verbose level forwarded.
    #[must_use]
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Only forward records whose target starts with `prefix`.
    #[must_use]
    pub fn target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.target_prefix = Some(prefix.into());
        self
    }

    /// Prefix each line with `<target>: `.
    #[must_use]
    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    /// Install as the global logger.
    ///
    /// # Errors
    ///
    /// Fails if a global logger is already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        log::set_max_level(self.level);
        log::set_boxed_logger(Box::new(self))
    }

    fn accepts_target(&self, target: &str) -> bool {
        !is_internal(target)
            && self
                .target_prefix
                .as_deref()
                .is_none_or(|prefix| target.starts_with(prefix))
    }

    fn format_record(&self, record: &Record<'_>) -> String {
        if self.show_target {
            format!("{}: {}", record.target(), record.args())
        } else {
            record.args().to_string()
        }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
            && self.accepts_target(metadata.target())
            && !self.logger.is_muted_at(level_offset(metadata.level()))
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.logger
            .println(level_offset(record.level()), self.format_record(record));
    }

    fn flush(&self) {}
}

#[cfg(feature = "tracing-layer")]
mod tracing_integration {
    use std::fmt::Debug;

    use log::Level;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level as TracingLevel, Subscriber};
    use tracing_subscriber::{Layer, layer::Context};

    use super::{is_internal, level_offset};
    use crate::logger::Logger;

    /// Tracing layer printing events through a [`Logger`].
    #[derive(Debug, Clone)]
    pub struct ConcLogLayer {
        logger: Logger,
        show_target: bool,
    }

    impl ConcLogLayer {
        #[must_use]
        pub fn new(logger: Logger) -> Self {
            Self {
                logger,
                show_target: false,
            }
        }

        #[must_use]
        pub fn show_target(mut self, show: bool) -> Self {
            self.show_target = show;
            self
        }

        /// Install as the global tracing subscriber.
        ///
        /// # Errors
        ///
        /// Fails if a global subscriber is already installed.
        pub fn init(self) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
            use tracing_subscriber::prelude::*;

            let subscriber = tracing_subscriber::registry().with(self);
            tracing::subscriber::set_global_default(subscriber)
        }
    }

    #[derive(Default)]
    struct EventVisitor {
        message: Option<String>,
        fields: Vec<(String, String)>,
    }

    impl Visit for EventVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                self.message = Some(value.to_string());
            } else {
                self.fields.push((field.name().to_string(), value.to_string()));
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
            let rendered = format!("{value:?}");
            if field.name() == "message" {
                self.message = Some(rendered);
            } else {
                self.fields.push((field.name().to_string(), rendered));
            }
        }
    }

    impl EventVisitor {
        fn into_text(self) -> String {
            let mut text = self.message.unwrap_or_default();
            for (name, value) in self.fields {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&name);
                text.push('=');
                text.push_str(&value);
            }
            text
        }
    }

    fn map_tracing_level(level: TracingLevel) -> Level {
        match level {
            TracingLevel::TRACE => Level::Trace,
            TracingLevel::DEBUG => Level::Debug,
            TracingLevel::INFO => Level::Info,
            TracingLevel::WARN => Level::Warn,
            TracingLevel::ERROR => Level::Error,
        }
    }

    impl<S> Layer<S> for ConcLogLayer
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            if is_internal(metadata.target()) {
                return;
            }
            let offset = level_offset(map_tracing_level(*metadata.level()));
            if self.logger.is_muted_at(offset) {
                return;
            }

            let mut visitor = EventVisitor::default();
            event.record(&mut visitor);
            let text = visitor.into_text();
            let text = if self.show_target {
                format!("{}: {text}", metadata.target())
            } else {
                text
            };
            self.logger.println(offset, text);
        }
    }

}

#[cfg(feature = "tracing-layer")]
pub use tracing_integration::ConcLogLayer;

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(verbosity: u32) -> (LogBridge, crate::output::CaptureBuffer) {
        let logger = Logger::new();
        let output = logger.capture();
        logger.set_verbosity(verbosity);
        logger.set_window_columns(Some(80));
        (LogBridge::new(logger), output)
    }

    fn record<'a>(level: Level, target: &'a str, args: std::fmt::Arguments<'a>) -> Record<'a> {
        Record::builder().level(level).target(target).args(args).build()
    }

    #[test]
    fn test_level_offsets() {
        assert_eq!(level_offset(Level::Error), 0);
        assert_eq!(level_offset(Level::Warn), 0);
        assert_eq!(level_offset(Level::Info), 1);
        assert_eq!(level_offset(Level::Debug), 2);
        assert_eq!(level_offset(Level::Trace), 3);
    }

    #[test]
    fn test_records_are_printed_at_offset_levels() {
        let (bridge, output) = bridge(3);
        bridge.log(&record(Level::Error, "app", format_args!("failed")));
        bridge.log(&record(Level::Debug, "app", format_args!("details")));
        bridge.log(&record(Level::Trace, "app", format_args!("noise")));
        assert_eq!(output.contents(), "1| failed\n3|   details\n");
    }

    #[test]
    fn test_internal_targets_are_ignored() {
        let (bridge, output) = bridge(3);
        bridge.log(&record(Level::Warn, "conclog::render", format_args!("loop")));
        assert_eq!(output.contents(), "");
    }

    #[test]
    fn test_filters() {
        let (bridge, output) = bridge(3);
        let bridge = bridge
            .level(LevelFilter::Info)
            .target_prefix("db")
            .show_target(true);
        bridge.log(&record(Level::Info, "db::pool", format_args!("connected")));
        bridge.log(&record(Level::Info, "http", format_args!("request")));
        bridge.log(&record(Level::Debug, "db::pool", format_args!("query")));
        assert_eq!(output.contents(), "2|  db::pool: connected\n");
    }
}
