//! The [`Transport`] seam and its built-in implementations.

use std::sync::{Arc, Mutex, PoisonError};

use log_schema::LogEntry;

use crate::console::ConsoleSink;
use crate::error::SinkWriteError;
use crate::file::DatedFileSink;
use crate::flush::FlushHandle;
use crate::rotating::RotatingSink;

/// A single delivery target for log entries.
///
/// Implementations are called synchronously on the caller's thread and must
/// not block on anything slower than a local write. Errors are reported by
/// the router and never reach the logging caller.
pub trait Transport: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    fn deliver(&self, entry: &LogEntry) -> Result<(), SinkWriteError>;
}

/// Colorized terminal output, written inline.
pub struct ConsoleTransport {
    sink: ConsoleSink,
}

impl ConsoleTransport {
    pub fn new(sink: ConsoleSink) -> Self {
        Self { sink }
    }
}

impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    fn deliver(&self, entry: &LogEntry) -> Result<(), SinkWriteError> {
        self.sink.write(entry)
    }
}

/// Per-level dated JSON-lines files, written inline.
pub struct FileTransport {
    name: String,
    sink: Mutex<DatedFileSink>,
}

impl FileTransport {
    pub fn new(name: impl Into<String>, sink: DatedFileSink) -> Self {
        Self {
            name: name.into(),
            sink: Mutex::new(sink),
        }
    }
}

impl Transport for FileTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, entry: &LogEntry) -> Result<(), SinkWriteError> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(entry)
    }
}

/// Rotating archive written inline, one entry per write.
pub struct RotatingTransport {
    name: String,
    sink: Arc<Mutex<RotatingSink>>,
}

impl RotatingTransport {
    pub fn new(name: impl Into<String>, sink: Arc<Mutex<RotatingSink>>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }
}

impl Transport for RotatingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, entry: &LogEntry) -> Result<(), SinkWriteError> {
        let line = entry.to_json_line()?;
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(&line)
    }
}

/// Hands a serialized copy of each entry to a flush worker.
pub struct BufferedTransport {
    handle: FlushHandle,
}

impl BufferedTransport {
    pub fn new(handle: FlushHandle) -> Self {
        Self { handle }
    }
}

impl Transport for BufferedTransport {
    fn name(&self) -> &str {
        self.handle.name()
    }

    fn deliver(&self, entry: &LogEntry) -> Result<(), SinkWriteError> {
        let line = entry.to_json_line()?;
        self.handle.enqueue(line)?;
        Ok(())
    }
}
