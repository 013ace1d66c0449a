//! Event/log channel between producer threads and the update loop.
//!
//! ```text
//! init thread ─┐
//! watcher ─────┼─> EventQueue ─> Live::update (single consumer)
//! compiler ────┘     ├─ logs   (drained every tick)
//!                    └─ events (drained after init, never while linking)
//! ```
//!
//! Both streams are unbounded FIFOs, so producers never block and per-producer
//! order is preserved. Interleaving between producers is unspecified.

use std::fmt;
use std::path::PathBuf;

use crossbeam::channel::{self, Receiver, Sender};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single log line produced anywhere in the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: LogSeverity,
    pub message: String,
}

impl LogRecord {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Everything that travels through the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A watched file was created, modified or removed.
    FileChanged(PathBuf),
    /// A log record.
    Log(LogRecord),
}

/// Thread-safe queue multiplexing log records and domain events.
///
/// Shared as `Arc<EventQueue>` by every producer; only `Live::update`
/// pops from it.
#[derive(Debug)]
pub struct EventQueue {
    logs_tx: Sender<LogRecord>,
    logs_rx: Receiver<LogRecord>,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (logs_tx, logs_rx) = channel::unbounded();
        let (events_tx, events_rx) = channel::unbounded();
        Self {
            logs_tx,
            logs_rx,
            events_tx,
            events_rx,
        }
    }

    /// Route an event to its stream by tag.
    pub fn push(&self, event: Event) {
        match event {
            Event::Log(record) => {
                let _ = self.logs_tx.send(record);
            }
            event @ Event::FileChanged(_) => {
                let _ = self.events_tx.send(event);
            }
        }
    }

    pub fn add_log(&self, severity: LogSeverity, message: impl Into<String>) {
        self.push(Event::Log(LogRecord::new(severity, message)));
    }

    pub fn add_file_changed(&self, path: impl Into<PathBuf>) {
        self.push(Event::FileChanged(path.into()));
    }

    /// Pop the oldest log record, if any.
    pub fn pop_log(&self) -> Option<LogRecord> {
        self.logs_rx.try_recv().ok()
    }

    /// Pop the oldest domain event, if any.
    pub fn pop_event(&self) -> Option<Event> {
        self.events_rx.try_recv().ok()
    }

    pub fn pending_events(&self) -> usize {
        self.events_rx.len()
    }
}

/// Shorthand for `queue.add_log(LogSeverity::X, format!(..))`.
///
/// ```ignore
/// emit!(events, Warning, "directory doesn't exist: {}", dir.display());
/// ```
#[macro_export]
macro_rules! emit {
    ($queue:expr, $severity:ident, $($arg:tt)*) => {{
        $queue.add_log($crate::event::LogSeverity::$severity, format!($($arg)*))
    }};
}

// ============================================================================
// Tests
// ============================================================================
