//! Diagnostic logging for the client and its plugins.
//!
//! Debug output goes through a `Console` sink supplied by the environment.
//! The default sink forwards to `tracing`. Output is suppressed entirely
//! unless the client was configured with `debug: true`.

use std::fmt::Display;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Tag prefixed to every client message.
pub const TAG: &str = "[heimdallr]";

/// Severity of a console message.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warn,
    Error,
    Trace,
}

impl Default for ConsoleLevel {
    fn default() -> Self {
        Self::Warn
    }
}

/// A console-like output sink.
pub trait Console: Send + Sync {
    /// Writes `message` at `level`.
    ///
    /// Returns false when the sink has no output for `level`; nothing is
    /// written in that case.
    fn write(&self, level: ConsoleLevel, tag: &str, message: &str) -> bool;
}

/// Console sink backed by `tracing` events under the `heimdallr` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn write(&self, level: ConsoleLevel, tag: &str, message: &str) -> bool {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => {
                tracing::info!(target: "heimdallr", "{tag} {message}");
            }
            ConsoleLevel::Debug => tracing::debug!(target: "heimdallr", "{tag} {message}"),
            ConsoleLevel::Warn => tracing::warn!(target: "heimdallr", "{tag} {message}"),
            ConsoleLevel::Error => tracing::error!(target: "heimdallr", "{tag} {message}"),
            ConsoleLevel::Trace => tracing::trace!(target: "heimdallr", "{tag} {message}"),
        }
        true
    }
}

/// Debug-gated logger handed to the client and to plugins.
#[derive(Clone)]
pub struct Logger {
    sink: Option<Arc<dyn Console>>,
    debug: bool,
}

impl Logger {
    /// A logger writing to `sink` when `debug` is set.
    #[must_use]
    pub fn new(sink: Option<Arc<dyn Console>>, debug: bool) -> Self {
        Self { sink, debug }
    }

    /// A logger that never writes.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: None,
            debug: false,
        }
    }

    /// Returns true if messages can reach a sink.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.debug && self.sink.is_some()
    }

    /// Writes a tagged message at `level`.
    ///
    /// No-op without a sink or with debug off. If the sink cannot write at
    /// `level`, a single "Type does not exist" warning is written instead and
    /// the message itself is dropped.
    pub fn log(&self, message: impl Display, level: ConsoleLevel) {
        if !self.debug {
            return;
        }
        let Some(sink) = self.sink.as_deref() else {
            return;
        };
        if !sink.write(level, TAG, &message.to_string()) {
            sink.write(ConsoleLevel::Warn, TAG, "Type does not exist");
        }
    }

    /// Shorthand for `log(message, ConsoleLevel::Warn)`.
    pub fn warn(&self, message: impl Display) {
        self.log(message, ConsoleLevel::Warn);
    }

    /// Shorthand for `log(message, ConsoleLevel::Error)`.
    pub fn error(&self, message: impl Display) {
        self.log(message, ConsoleLevel::Error);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &self.sink.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that only supports the levels it is built with.
    #[derive(Default)]
    struct Recording {
        supported: Vec<ConsoleLevel>,
        lines: Mutex<Vec<(ConsoleLevel, String)>>,
    }

    impl Console for Recording {
        fn write(&self, level: ConsoleLevel, tag: &str, message: &str) -> bool {
            if !self.supported.contains(&level) {
                return false;
            }
            self.lines
                .lock()
                .unwrap()
                .push((level, format!("{tag} {message}")));
            true
        }
    }

    fn recording(supported: Vec<ConsoleLevel>) -> Arc<Recording> {
        Arc::new(Recording {
            supported,
            lines: Mutex::default(),
        })
    }

    #[test]
    fn writes_tagged_message_when_debug() {
        let sink = recording(vec![ConsoleLevel::Error, ConsoleLevel::Warn]);
        let logger = Logger::new(Some(sink.clone()), true);
        logger.log("boom", ConsoleLevel::Error);
        assert_eq!(
            *sink.lines.lock().unwrap(),
            vec![(ConsoleLevel::Error, "[heimdallr] boom".to_string())]
        );
    }

    #[test]
    fn silent_without_debug_or_sink() {
        let sink = recording(vec![ConsoleLevel::Warn]);
        Logger::new(Some(sink.clone()), false).warn("hidden");
        assert!(sink.lines.lock().unwrap().is_empty());

        let logger = Logger::new(None, true);
        assert!(!logger.is_enabled());
        logger.warn("nowhere");
        assert!(!Logger::disabled().is_enabled());
    }

    #[test]
    fn unsupported_level_falls_back_once() {
        let sink = recording(vec![ConsoleLevel::Warn]);
        let logger = Logger::new(Some(sink.clone()), true);
        logger.log("lost", ConsoleLevel::Trace);
        assert_eq!(
            *sink.lines.lock().unwrap(),
            vec![(ConsoleLevel::Warn, "[heimdallr] Type does not exist".to_string())]
        );
    }

    #[test]
    fn fallback_does_not_loop_when_warn_missing() {
        let sink = recording(vec![]);
        let logger = Logger::new(Some(sink.clone()), true);
        logger.log("lost", ConsoleLevel::Info);
        assert!(sink.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn tracing_console_supports_every_level() {
        let console = TracingConsole;
        for level in [
            ConsoleLevel::Log,
            ConsoleLevel::Debug,
            ConsoleLevel::Info,
            ConsoleLevel::Warn,
            ConsoleLevel::Error,
            ConsoleLevel::Trace,
        ] {
            assert!(console.write(level, TAG, "x"));
        }
    }
}
