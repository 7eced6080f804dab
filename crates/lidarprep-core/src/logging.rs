//! Human-readable progress log shared by all batch operations
//!
//! Operations report through a [`LogSink`]. Each [`LogEvent`] carries a
//! [`LogLevel`] whose glyph prefixes the rendered line. Sinks must be safe to
//! share across worker threads and must never split a single line.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Status of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Success,
    Warning,
    Error,
    Info,
}

impl LogLevel {
    /// Glyph prefixed to rendered lines
    pub fn glyph(&self) -> &'static str {
        match self {
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠",
            LogLevel::Error => "✗",
            LogLevel::Info => "ℹ",
        }
    }
}

/// One line of the progress log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    /// Mirror the event to `tracing` at the matching level
    pub fn trace(&self) {
        match self.level {
            LogLevel::Error => tracing::error!("{}", self.message),
            LogLevel::Warning => tracing::warn!("{}", self.message),
            LogLevel::Success | LogLevel::Info => tracing::info!("{}", self.message),
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.glyph(), self.message)
    }
}

/// Destination for progress log lines
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

impl dyn LogSink + '_ {
    pub fn success(&self, message: impl fmt::Display) {
        self.emit(LogEvent::new(LogLevel::Success, message.to_string()));
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(LogEvent::new(LogLevel::Info, message.to_string()));
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.emit(LogEvent::new(LogLevel::Warning, message.to_string()));
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.emit(LogEvent::new(LogLevel::Error, message.to_string()));
    }
}

/// Sink that only forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        event.trace();
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }
}

impl LogSink for CollectingSink {
    fn emit(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Append-only run-history file.
///
/// Lines are buffered and written on [`RunLog::flush`], followed by a blank
/// separator line. Dropping the log flushes whatever is still buffered.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    buffer: Mutex<Vec<String>>,
}

impl RunLog {
    /// Create a run log named after the current local time inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
        Self::at_path(dir.as_ref().join(format!("log_{}.txt", timestamp)))
    }

    /// Create a run log writing to an explicit file
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), buffer: Mutex::new(Vec::new()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Buffer a raw line with a timestamp prefix
    pub fn log(&self, text: impl fmt::Display) {
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%d:%H:%M:%S"), text);
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(line);
        }
    }

    /// Append buffered lines to the file. Failures are reported, not raised.
    pub fn flush(&self) {
        let Ok(mut buffer) = self.buffer.lock() else {
            return;
        };
        if buffer.is_empty() {
            return;
        }

        match self.append(&buffer) {
            Ok(()) => buffer.clear(),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                "Failed to write run log: {}",
                e
            ),
        }
    }

    fn append(&self, lines: &[String]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        write!(file, "{}\n\n", lines.join("\n"))?;
        Ok(())
    }
}

impl LogSink for RunLog {
    fn emit(&self, event: LogEvent) {
        self.log(event);
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_event_display_uses_glyph() {
        let event = LogEvent::new(LogLevel::Warning, "file a.csv has no valid points");
        assert_eq!(event.to_string(), "⚠ file a.csv has no valid points");
        assert_eq!(LogLevel::Success.glyph(), "✓");
        assert_eq!(LogLevel::Error.glyph(), "✗");
    }

    #[test]
    fn test_collecting_sink_helpers() {
        let sink = CollectingSink::new();
        let dyn_sink: &dyn LogSink = &sink;
        dyn_sink.info("reading a.txt");
        dyn_sink.error("failed");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1], LogEvent::new(LogLevel::Error, "failed"));
    }

    #[test]
    fn test_run_log_flush_appends_block() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::at_path(dir.path().join("history").join("log.txt"));
        log.emit(LogEvent::new(LogLevel::Success, "done a.txt"));
        log.log("plain line");
        log.flush();
        log.log("second run");
        log.flush();

        let content = fs::read_to_string(log.path()).unwrap();
        let blocks: Vec<&str> = content.split("\n\n").filter(|b| !b.is_empty()).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].lines().next().unwrap().ends_with("✓ done a.txt"));
        assert!(blocks[0].lines().nth(1).unwrap().ends_with("plain line"));
        assert!(blocks[0].starts_with('['));
    }

    #[test]
    fn test_run_log_flushes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = {
            let log = RunLog::new(dir.path());
            log.log("buffered");
            log.path().to_path_buf()
        };
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("log_") && name.ends_with(".txt"));
        assert!(fs::read_to_string(&path).unwrap().contains("buffered"));
    }

    #[test]
    fn test_empty_run_log_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        drop(RunLog::at_path(&path));
        assert!(!path.exists());
    }
}
