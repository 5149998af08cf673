//! Host logging contract.
//!
//! The core emits `tracing` events; `core_runtime::logging` turns the ones a
//! host cares about into [`LogEntry`] values and hands them to a
//! [`LoggerSink`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event as seen by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path of the emitter, e.g. `core_device::bridge`.
    pub target: String,
    pub message: String,
    /// Event fields rendered as text (`frames`, `device_id`, ...).
    pub fields: HashMap<String, String>,
    /// Name of the innermost span the event was emitted in.
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5} {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.as_str().to_uppercase(),
            self.target,
            self.message
        )?;
        let mut keys: Vec<&String> = self.fields.keys().collect();
        keys.sort();
        for key in keys {
            write!(f, " {}={}", key, self.fields[key])?;
        }
        Ok(())
    }
}

/// Receives log entries from the core.
///
/// `log` runs synchronously on the thread that emitted the event. That
/// includes backend callback threads when a routine fails, so an
/// implementation must not block on I/O.
pub trait LoggerSink: Send + Sync {
    fn log(&self, entry: LogEntry) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are dropped before they are built.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Writes entries to stderr, one line each. For development hosts.
#[derive(Debug, Clone, Copy)]
pub struct StderrSink {
    pub min_level: LogLevel,
}

impl Default for StderrSink {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

impl LoggerSink for StderrSink {
    fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level >= self.min_level {
            eprintln!("{}", entry);
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fields() {
        let entry = LogEntry::new(LogLevel::Warn, "core_device::bridge", "playback overflow")
            .with_field("len", "18")
            .with_span_id("process");

        assert_eq!(entry.field("len"), Some("18"));
        assert_eq!(entry.field("max"), None);
        assert_eq!(entry.span_id.as_deref(), Some("process"));
    }

    #[test]
    fn test_entry_display_sorts_fields() {
        let entry = LogEntry::new(LogLevel::Error, "core_decode", "decode failed")
            .with_field("path", "a.wav")
            .with_field("frames", "12");
        let line = entry.to_string();

        assert!(line.contains("ERROR core_decode: decode failed frames=12 path=a.wav"));
    }

    #[test]
    fn test_level_order_and_names() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
    }

    #[test]
    fn test_stderr_sink_level() {
        let sink = StderrSink {
            min_level: LogLevel::Warn,
        };
        assert_eq!(sink.min_level(), LogLevel::Warn);
        sink.log(LogEntry::new(LogLevel::Info, "test", "dropped")).unwrap();
    }
}
