//! Structured logging.
//!
//! A small, self-contained logging facility in the spirit of the larger
//! framework loggers: level filtering, JSON or compact rendering, and
//! structured fields. The router emits one entry per dispatched request
//! (method, path, status); handlers reach the logger through the request
//! context.
//!
//! # JSON Output Schema
//!
//! ```json
//! {
//!     "timestamp_ms": 1726488000123,
//!     "level": "info",
//!     "message": "request served",
//!     "target": "darter::router",
//!     "fields": {"method": "GET", "path": "/user/gopher", "status": 200}
//! }
//! ```

use std::fmt;
use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

/// Log levels, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Most verbose, for detailed debugging.
    Trace = 0,
    /// Debug information, not shown in production.
    Debug = 1,
    /// General information about normal operation.
    Info = 2,
    /// Something unexpected but recoverable.
    Warn = 3,
    /// An error that affected request processing.
    Error = 4,
}

impl LogLevel {
    /// Returns the level as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level to emit.
    pub level: LogLevel,
    /// Render entries as one JSON object per line; compact text otherwise.
    pub json_output: bool,
    /// Include the module target in rendered entries.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_output: true,
            include_target: false,
        }
    }
}

impl LogConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level to emit.
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable JSON rendering.
    #[must_use]
    pub fn json_output(mut self, json: bool) -> Self {
        self.json_output = json;
        self
    }

    /// Enable or disable the module target in rendered entries.
    #[must_use]
    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }
}

/// One log entry, ready to render.
#[derive(Debug)]
pub struct LogEntry<'a> {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u128,
    /// Entry level.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: &'a str,
    /// Module path of the emitter.
    pub target: &'a str,
    /// Structured fields.
    pub fields: &'a [(&'a str, serde_json::Value)],
}

impl LogEntry<'_> {
    /// Render the entry as a single JSON object.
    #[must_use]
    pub fn to_json(&self, include_target: bool) -> String {
        let mut map = serde_json::Map::new();
        map.insert("timestamp_ms".into(), serde_json::json!(self.timestamp_ms as u64));
        map.insert("level".into(), serde_json::json!(self.level.as_str()));
        map.insert("message".into(), serde_json::json!(self.message));
        if include_target {
            map.insert("target".into(), serde_json::json!(self.target));
        }
        if !self.fields.is_empty() {
            let mut fields = serde_json::Map::new();
            for (key, value) in self.fields {
                fields.insert((*key).to_string(), value.clone());
            }
            map.insert("fields".into(), serde_json::Value::Object(fields));
        }
        serde_json::Value::Object(map).to_string()
    }

    /// Render the entry as compact human-readable text.
    #[must_use]
    pub fn to_compact(&self, include_target: bool) -> String {
        let mut line = String::new();
        let _ = write!(line, "{:5} ", self.level.as_str().to_ascii_uppercase());
        if include_target {
            let _ = write!(line, "{} ", self.target);
        }
        line.push_str(self.message);
        for (key, value) in self.fields {
            let _ = write!(line, " {key}={value}");
        }
        line
    }
}

enum Sink {
    Stderr,
    Null,
}

/// A level-filtered logger writing rendered entries to stderr.
pub struct Logger {
    config: LogConfig,
    sink: Sink,
}

impl Logger {
    /// Create a logger with the given configuration.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            sink: Sink::Stderr,
        }
    }

    /// Create a logger that drops every entry. Useful in tests.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            config: LogConfig::default(),
            sink: Sink::Null,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Whether an entry at `level` would be emitted.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        !matches!(self.sink, Sink::Null) && level >= self.config.level
    }

    /// Emit an entry at [`LogLevel::Trace`].
    pub fn trace(&self, target: &str, message: &str, fields: &[(&str, serde_json::Value)]) {
        self.log(LogLevel::Trace, target, message, fields);
    }

    /// Emit an entry at [`LogLevel::Debug`].
    pub fn debug(&self, target: &str, message: &str, fields: &[(&str, serde_json::Value)]) {
        self.log(LogLevel::Debug, target, message, fields);
    }

    /// Emit an entry at [`LogLevel::Info`].
    pub fn info(&self, target: &str, message: &str, fields: &[(&str, serde_json::Value)]) {
        self.log(LogLevel::Info, target, message, fields);
    }

    /// Emit an entry at [`LogLevel::Warn`].
    pub fn warn(&self, target: &str, message: &str, fields: &[(&str, serde_json::Value)]) {
        self.log(LogLevel::Warn, target, message, fields);
    }

    /// Emit an entry at [`LogLevel::Error`].
    pub fn error(&self, target: &str, message: &str, fields: &[(&str, serde_json::Value)]) {
        self.log(LogLevel::Error, target, message, fields);
    }

    fn log(&self, level: LogLevel, target: &str, message: &str, fields: &[(&str, serde_json::Value)]) {
        if !self.enabled(level) {
            return;
        }
        let entry = LogEntry {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            level,
            message,
            target,
            fields,
        };
        let line = if self.config.json_output {
            entry.to_json(self.config.include_target)
        } else {
            entry.to_compact(self.config.include_target)
        };
        eprintln!("{line}");
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry<'a>(fields: &'a [(&'a str, serde_json::Value)]) -> LogEntry<'a> {
        LogEntry {
            timestamp_ms: 1000,
            level: LogLevel::Info,
            message: "request served",
            target: "darter::router",
            fields,
        }
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn json_rendering_contains_fields() {
        let fields = [("method", json!("GET")), ("status", json!(200))];
        let rendered = entry(&fields).to_json(true);
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");

        assert_eq!(value["level"], "info");
        assert_eq!(value["message"], "request served");
        assert_eq!(value["target"], "darter::router");
        assert_eq!(value["fields"]["method"], "GET");
        assert_eq!(value["fields"]["status"], 200);
    }

    #[test]
    fn compact_rendering_appends_fields() {
        let fields = [("status", json!(404))];
        let rendered = entry(&fields).to_compact(false);
        assert_eq!(rendered, "INFO  request served status=404");
    }

    #[test]
    fn disabled_logger_is_never_enabled() {
        let logger = Logger::disabled();
        assert!(!logger.enabled(LogLevel::Error));
    }

    #[test]
    fn level_filter_applies() {
        let logger = Logger::new(LogConfig::new().level(LogLevel::Warn));
        assert!(!logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Warn));
        assert!(logger.enabled(LogLevel::Error));
    }
}
