//! Errors reported by the logging engine.
//!
//! All registry and scheduler variants signal programmer misuse: they are
//! returned synchronously to the offending call and never retried.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors returned by [`crate::Logger`] operations.
#[derive(Debug)]
pub enum LoggerError {
    /// A thread registry was attached while another one is already attached.
    DuplicateRegistryAttachment,
    /// A scheduler switch or thread registration happened before any
    /// thread registry was attached.
    MissingRegistry,
    /// A scheduler switch was attempted while the registry reports
    /// registered non-main threads.
    UnsafeSchedulerSwitch,
    /// The output could not be redirected to a file.
    Io { path: PathBuf, err: io::Error },
    /// The consumer thread of the non-blocking scheduler could not be started.
    Spawn(io::Error),
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistryAttachment => {
                write!(f, "a thread registry is already attached")
            }
            Self::MissingRegistry => write!(f, "no thread registry attached"),
            Self::UnsafeSchedulerSwitch => {
                write!(f, "cannot change scheduler while threads are registered")
            }
            Self::Io { path, err } => {
                write!(f, "failed to redirect output to {}: {err}", path.display())
            }
            Self::Spawn(err) => write!(f, "failed to start the consumer thread: {err}"),
        }
    }
}

impl std::error::Error for LoggerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { err, .. } | Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience alias for results of engine operations.
pub type Result<T> = std::result::Result<T, LoggerError>;
