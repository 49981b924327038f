//! Level and scope guards.
//!
//! Both guards undo their level change on drop, so early returns and
//! unwinding leave the calling thread at the level it started from.

use crate::logger::Logger;

/// Raises the calling thread's level for its lifetime.
#[derive(Debug)]
#[must_use = "the level is restored as soon as the guard is dropped"]
pub struct LevelGuard {
    logger: Logger,
    increase: u32,
}

impl LevelGuard {
    pub(crate) fn new(logger: Logger, increase: u32) -> Self {
        logger.increase_level(increase);
        Self { logger, increase }
    }
}

impl Drop for LevelGuard {
    fn drop(&mut self) {
        self.logger.decrease_level(self.increase);
    }
}

/// A named logging scope.
///
/// Creating the guard raises the level and, if enabled, logs
/// `Enters '<scope>'`. Dropping it logs `Exits '<scope>'` if enabled, lowers
/// the level again and releases the scope's held line.
///
/// ```rust
/// use conclog::Logger;
///
/// let logger = Logger::new();
/// let output = logger.capture();
/// logger.set_verbosity(2);
/// logger.set_window_columns(Some(80));
/// logger.set_prints_scope_entrance(true);
/// {
///     let _scope = logger.scope("load");
///     logger.println(0, "reading");
/// }
/// assert_eq!(output.contents(), "2|  Enters 'load'\n |  reading\n");
/// ```
#[derive(Debug)]
#[must_use = "the scope is closed as soon as the guard is dropped"]
pub struct ScopeGuard {
    logger: Logger,
    name: String,
    increase: u32,
}

impl ScopeGuard {
    pub(crate) fn new(logger: Logger, name: String, increase: u32) -> Self {
        logger.increase_level(increase);
        if logger.configuration().prints_scope_entrance() && !logger.is_muted_at(0) {
            logger.println(0, format!("Enters '{name}'"));
        }
        Self {
            logger,
            name,
            increase,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set this scope's held line.
    pub fn hold(&self, text: impl Into<String>) {
        self.logger.hold(self.name.clone(), text);
    }

    /// Release this scope's held line before the guard is dropped.
    pub fn release(&self) {
        self.logger.release(self.name.clone());
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.logger.configuration().prints_scope_exit() && !self.logger.is_muted_at(0) {
            self.logger.println(0, format!("Exits '{}'", self.name));
        }
        self.logger.decrease_level(self.increase);
        self.logger.release(std::mem::take(&mut self.name));
    }
}

#[cfg(test)]
mod tests {
    use crate::logger::Logger;
    use crate::output::CaptureBuffer;

    fn logger(verbosity: u32) -> (Logger, CaptureBuffer) {
        let logger = Logger::new();
        let buffer = logger.capture();
        logger.set_verbosity(verbosity);
        logger.set_window_columns(Some(80));
        (logger, buffer)
    }

    #[test]
    fn test_scope_restores_level() {
        let (logger, _) = logger(3);
        {
            let _outer = logger.scope("outer");
            assert_eq!(logger.current_level(), 2);
            let _inner = logger.scope_at("inner", 3);
            assert_eq!(logger.current_level(), 5);
        }
        assert_eq!(logger.current_level(), 1);
    }

    #[test]
    fn test_entrance_and_exit_lines() {
        let (logger, buf) = logger(2);
        logger.set_prints_scope_entrance(true);
        logger.set_prints_scope_exit(true);
        {
            let _scope = logger.scope("parse");
        }
        assert_eq!(buf.contents(), "2|  Enters 'parse'\n |  Exits 'parse'\n");
    }

    #[test]
    fn test_muted_scope_prints_nothing() {
        let (logger, buf) = logger(1);
        logger.set_prints_scope_entrance(true);
        logger.set_prints_scope_exit(true);
        {
            let _scope = logger.scope("deep");
        }
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn test_drop_releases_held_line() {
        let (logger, buf) = logger(2);
        {
            let scope = logger.scope("task");
            scope.hold("busy");
            assert_eq!(scope.name(), "task");
        }
        let held = "2| busy ";
        assert_eq!(
            buf.contents(),
            format!("\r{held}\r{}\r", " ".repeat(held.len()))
        );
    }
}
