//! Custom logging primitives for the citenet project.
//!
//! This module provides a tiny, purposely minimal logging surface used by the
//! codebase. The goals are to remain dependency-light while offering a
//! consistently-typed `LogLevel` and a `Logger` trait that is easy to implement
//! in tests and small binaries. For production-grade structured logging or
//! filtering, replace or wrap these primitives with a more featureful logger
//! (for example `tracing` or `log` + `env_logger`).
//!
//! Responsibilities:
//! - Provide a lightweight `Logger` trait used across the crate
//! - Offer a baseline no-op implementation for tests and benchmarking
//! - Centralize log level semantics without pulling a full logging framework
//!
//! Implementors of `Logger` must be `Send + Sync + 'static` so the trait
//! objects can be stored in the global facade and shared between threads.

use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Returns a short string representation suitable for logs.
impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Minimal logger interface used throughout the project.
///
/// Must be `Send + Sync + 'static` for global usage. The core requirement is a
/// single `log` method; convenience helpers like `info` and `warn` are
/// implemented in terms of `log` so tests can provide a tiny implementation
/// without implementing all helpers.
pub trait Logger: Send + Sync + 'static {
    /// Emit a log record at the given level.
    fn log(&self, _level: LogLevel, _message: &str) {}

    /// Flush any buffered records.
    fn flush(&self) {}

    /// Convenience methods
    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Downcasting helper
    fn as_any(&self) -> &dyn Any;
}

/// No-op logger used by default in tests and when logging is disabled.
///
/// `NoopLogger` implements `Logger` but drops all messages. It's useful in
/// unit tests where you want to assert behavior without emitting output. The
/// type is `Copy + Default` to make it lightweight to pass around.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {
        // intentionally do nothing
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Small stdout logger used by the CLI.
///
/// It writes a compact JSON object to stdout with a timestamp, level and
/// message so logs are easy to parse by structured log collectors. Filtering,
/// batching and non-blocking IO are out of scope here.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutLogger;

impl Logger for StdoutLogger {
    // Example: {"ts":"...","level":"INFO","msg":"..."}
    fn log(&self, level: LogLevel, message: &str) {
        let ts = chrono::Utc::now().to_rfc3339();
        let json = serde_json::json!({
            "ts": ts,
            "level": level.as_str(),
            "msg": message,
        });
        println!("{}", json);
    }

    fn flush(&self) {
        // stdout is line-buffered; nothing to do
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== LogLevel tests ==========

    #[test]
    fn test_loglevel_as_str_success() {
        assert_eq!(LogLevel::Trace.as_str(), "TRACE");
        assert_eq!(LogLevel::Debug.as_str(), "DEBUG");
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
        assert_eq!(LogLevel::Error.as_str(), "ERROR");
    }

    #[test]
    fn test_loglevel_ordering_is_monotonic() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    // edge case: ensure different variants are actually unequal
    #[test]
    fn test_loglevel_not_equal() {
        assert_ne!(LogLevel::Info, LogLevel::Error);
    }

    // ========== NoopLogger tests ==========

    #[test]
    fn test_nooplogger_accepts_all_levels() {
        let logger = NoopLogger;
        logger.trace("trace");
        logger.debug("debug");
        logger.info("info");
        logger.warn("warn");
        logger.error("error");
        logger.flush();
    }

    // ========== Logger trait default methods ==========

    #[derive(Default)]
    struct TestLogger {
        pub entries: std::sync::Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for TestLogger {
        fn log(&self, level: LogLevel, msg: &str) {
            self.entries.lock().unwrap().push((level, msg.to_string()));
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_trait_default_methods_success() {
        let logger = TestLogger::default();
        logger.info("info");
        logger.warn("warn");

        let entries = logger.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, LogLevel::Info);
        assert_eq!(entries[0].1, "info");
        assert_eq!(entries[1].0, LogLevel::Warn);
    }

    // Edge case: empty message
    #[test]
    fn test_trait_handles_empty_message() {
        let logger = TestLogger::default();
        logger.info("");

        let entries = logger.entries.lock().unwrap();
        assert_eq!(entries[0].1, "");
    }
}
