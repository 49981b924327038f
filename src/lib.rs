//! # conclog
//!
//! A concurrency-aware logging engine for multi-threaded terminal programs.
//!
//! Threads emit leveled, scoped lines; the engine serializes them onto one
//! output stream without interleaving, keeps per-thread ordering, and draws
//! "held" status lines on the last terminal row that are overwritten in
//! place and redrawn below every permanent line.
//!
//! ## Quick Start
//!
//! ```rust
//! use conclog::prelude::*;
//!
//! let logger = Logger::new();
//! logger.set_verbosity(2);
//! logger.set_theme(Theme::dark());
//!
//! logger.println(0, "loading x0 = 2.0^3");
//! let scope = logger.scope("fetch");
//! scope.hold("3 of 10");
//! logger.println(0, "details at level 2");
//! ```
//!
//! ## Core Concepts
//!
//! - **Logger**: cloneable handle; every operation goes through it
//! - **Scheduler**: decides when and where messages are rendered
//!   (immediate, blocking or non-blocking with a consumer thread)
//! - **Renderer**: sole owner of the output; preamble, wrapping, held lines
//! - **Theme**: per-character and keyword highlighting with 256-color codes
//! - **ThreadRegistry**: guards scheduler switches while threads run

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cells;
pub mod config;
pub mod error;
pub mod held;
pub mod highlight;
pub mod logger;
pub mod logging;
pub mod message;
pub mod output;
pub mod registry;
pub mod renderer;
pub mod scheduler;
pub mod scope;
pub mod style;
pub mod sync;
pub mod terminal;
pub mod theme;
pub mod thread;

/// Re-exports for convenient usage
pub mod prelude {
    pub use crate::config::{LoggerConfiguration, ThreadNamePolicy};
    pub use crate::error::{LoggerError, Result};
    pub use crate::logger::{Logger, MUTE_LEVEL_OFFSET};
    pub use crate::logging::LogBridge;
    pub use crate::output::CaptureBuffer;
    pub use crate::registry::{ThreadCounter, ThreadRegistry};
    pub use crate::scheduler::SchedulerKind;
    pub use crate::scope::{LevelGuard, ScopeGuard};
    pub use crate::style::{Attributes, TextStyle, palette};
    pub use crate::theme::{Theme, ThemeCategory};
    pub use crate::thread::LoggedThread;

    #[cfg(feature = "tracing-layer")]
    pub use crate::logging::ConcLogLayer;
}

// Re-export key types at crate root
pub use config::{LoggerConfiguration, ThreadNamePolicy};
pub use error::{LoggerError, Result};
pub use logger::Logger;
pub use logging::LogBridge;
pub use output::CaptureBuffer;
pub use registry::{ThreadCounter, ThreadRegistry};
pub use scheduler::SchedulerKind;
pub use scope::ScopeGuard;
pub use style::TextStyle;
pub use theme::Theme;
pub use thread::LoggedThread;

#[cfg(feature = "tracing-layer")]
pub use logging::ConcLogLayer;
