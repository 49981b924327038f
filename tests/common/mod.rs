//! Common test utilities and logging infrastructure
//!
//! The engine reports its own lifecycle through `tracing` under `conclog::`
//! targets; `init_test_logging` makes those diagnostics visible when a test
//! fails.
//!
//! # Environment Variables
//!
//! - `RUST_LOG=debug` - Enable debug logging in tests
//! - `RUST_LOG=conclog::consumer=trace` - Module-specific tracing
//! - `TEST_LOG_JSON=1` - Output JSON format for CI parsing

#![allow(dead_code)]

use std::sync::{Arc, Once};

use conclog::{CaptureBuffer, Logger, ThreadCounter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize test logging infrastructure.
///
/// The function is idempotent - calling it multiple times is safe.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let use_json = std::env::var("TEST_LOG_JSON").is_ok();
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("conclog=debug,test=info"));

        if use_json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_test_writer())
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_test_writer()
                        .with_thread_ids(true)
                        .with_target(true)
                        .compact(),
                )
                .try_init()
                .ok();
        }
    });
}

/// A test span guard that logs entry and exit.
pub fn test_phase(name: &str) -> tracing::span::EnteredSpan {
    let span = tracing::info_span!("test_phase", phase = name);
    tracing::info!(phase = name, "entering test phase");
    span.entered()
}

/// A logger writing into memory at a fixed width of 80 columns.
pub fn captured_logger(verbosity: u32) -> (Logger, CaptureBuffer) {
    let logger = Logger::new();
    let output = logger.capture();
    logger.set_verbosity(verbosity);
    logger.set_window_columns(Some(80));
    (logger, output)
}

/// Like [`captured_logger`], with a thread counter attached as registry.
pub fn registered_logger(verbosity: u32) -> (Logger, CaptureBuffer, Arc<ThreadCounter>) {
    let (logger, output) = captured_logger(verbosity);
    let counter = Arc::new(ThreadCounter::new());
    logger
        .attach_thread_registry(counter.clone())
        .expect("fresh logger has no registry");
    (logger, output, counter)
}

/// Remove ANSI SGR sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[38;5;208m1\x1b[0m| x"), "1| x");
    }
}
