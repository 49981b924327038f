//! Terminal detection.
//!
//! Window width comes from crossterm; environment reads are gathered into an
//! [`EnvSettings`] snapshot so configuration overlays can be tested without
//! touching the process environment.

use std::io::IsTerminal;

/// Width used when the terminal cannot report a usable size.
pub const DEFAULT_COLUMNS: usize = 80;
/// Widest terminal size accepted from the device.
pub const MAX_COLUMNS: usize = 512;

/// Snapshot of the environment variables the engine reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub verbosity: Option<String>,
    pub theme: Option<String>,
    pub thread_names: Option<String>,
    pub no_color: Option<String>,
}

impl EnvSettings {
    /// Read the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            verbosity: std::env::var("CONCLOG_VERBOSITY").ok(),
            theme: std::env::var("CONCLOG_THEME").ok(),
            thread_names: std::env::var("CONCLOG_THREAD_NAMES").ok(),
            no_color: std::env::var("NO_COLOR").ok(),
        }
    }

    /// True if `NO_COLOR` is set to a non-empty value (<https://no-color.org/>).
    #[must_use]
    pub fn color_disabled(&self) -> bool {
        self.no_color.as_deref().is_some_and(|value| !value.is_empty())
    }
}

/// Validate a width reported by the device.
#[must_use]
pub fn sanitize_columns(reported: Option<u16>) -> usize {
    match reported.map(usize::from) {
        Some(columns) if (1..=MAX_COLUMNS).contains(&columns) => columns,
        _ => DEFAULT_COLUMNS,
    }
}

/// Current terminal width in cells, or [`DEFAULT_COLUMNS`].
#[must_use]
pub fn window_columns() -> usize {
    sanitize_columns(crossterm::terminal::size().ok().map(|(w, _)| w))
}

/// Check if stderr is connected to a terminal.
#[must_use]
pub fn is_stderr_terminal() -> bool {
    std::io::stderr().is_terminal()
}
