//! Top-level logger exports and a small global facade.
//!
//! This module re-exports the core logging primitives and exposes a simple
//! global facade for programs that prefer a process-wide logger instance.
//!
//! - `Logger`: trait defining the logging surface
//! - `LogLevel`: enum of levels
//! - `NoopLogger`: default no-op implementation
//! - `StdoutLogger`: structured stdout logger used by the CLI
//!
//! ```rust,no_run
//! use citenet::logger;
//! logger::init_logger(logger::StdoutLogger);
//! logger::info("analysis started");
//! ```

pub mod core;

pub use self::core::{LogLevel, Logger, NoopLogger, StdoutLogger};

use std::sync::OnceLock;

/// Global logger facade.
///
/// A process-wide logger reference used by the convenience functions below.
/// `init_logger` installs the logger once, early in `main` (or from test
/// setup); later calls are ignored so concurrently-running tests cannot
/// clobber each other's logger. Before initialization every log call is a
/// no-op.
static GLOBAL_LOGGER: OnceLock<Box<dyn Logger>> = OnceLock::new();

/// Initialize the global logger for the lifetime of the program.
///
/// Only the first call takes effect.
pub fn init_logger<L: Logger>(logger: L) {
    let _ = GLOBAL_LOGGER.set(Box::new(logger));
}

/// Log using the global logger if set, otherwise no-op.
pub fn log(level: LogLevel, message: &str) {
    if let Some(logger) = GLOBAL_LOGGER.get() {
        logger.log(level, message);
    }
}

/// Convenience functions
pub fn info(msg: &str) {
    log(LogLevel::Info, msg);
}

pub fn debug(msg: &str) {
    log(LogLevel::Debug, msg);
}

pub fn warn(msg: &str) {
    log(LogLevel::Warn, msg);
}

pub fn error(msg: &str) {
    log(LogLevel::Error, msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_is_noop_before_init() {
        // Must not panic even when nothing is installed.
        log(LogLevel::Info, "dropped");
        info("dropped");
        error("dropped");
    }

    #[test]
    fn test_init_logger_is_idempotent() {
        init_logger(NoopLogger);
        init_logger(NoopLogger);
        info("still fine");
    }
}
