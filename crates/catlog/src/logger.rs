use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use field_redactor::Redactor;
use log_schema::{Category, FieldValidator, Level, LogEntry, LogRecord, ValidationError};
use log_transport::{FlushHandle, TransportRouter, WorkerError};
use serde_json::Value;
use tracing::{debug, error};

/// A category logger: validates, redacts and routes each entry.
///
/// The call path is synchronous and never waits on I/O slower than a local
/// file append; buffered targets only enqueue.
pub struct Logger {
    key: String,
    category: Category,
    validator: FieldValidator,
    redactor: Redactor,
    router: Arc<TransportRouter>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("key", &self.key)
            .field("category", &self.category)
            .field("redact_paths", &self.redactor.paths().len())
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(
        key: String,
        category: Category,
        validator: FieldValidator,
        redactor: Redactor,
        router: Arc<TransportRouter>,
    ) -> Self {
        Self {
            key,
            category,
            validator,
            redactor,
            router,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Validate, redact and dispatch a record attached by an upstream layer.
    ///
    /// Fails only with a [`ValidationError`], in which case nothing is
    /// dispatched. Transport failures are reported on the diagnostic channel.
    pub fn log(&self, level: Level, record: LogRecord) -> Result<(), ValidationError> {
        self.validator.validate(level, &record.fields)?;

        let entry = LogEntry::from_record(level, self.category, record);
        let entry = self.redactor.apply(entry);
        self.router.dispatch(&entry);
        Ok(())
    }

    pub fn trace(&self, fields: Value, message: impl Into<String>) -> Result<(), ValidationError> {
        self.log(Level::Trace, LogRecord::new(message).with_fields(fields))
    }

    pub fn debug(&self, fields: Value, message: impl Into<String>) -> Result<(), ValidationError> {
        self.log(Level::Debug, LogRecord::new(message).with_fields(fields))
    }

    pub fn info(&self, fields: Value, message: impl Into<String>) -> Result<(), ValidationError> {
        self.log(Level::Info, LogRecord::new(message).with_fields(fields))
    }

    pub fn warn(&self, fields: Value, message: impl Into<String>) -> Result<(), ValidationError> {
        self.log(Level::Warn, LogRecord::new(message).with_fields(fields))
    }

    pub fn error(&self, fields: Value, message: impl Into<String>) -> Result<(), ValidationError> {
        self.log(Level::Error, LogRecord::new(message).with_fields(fields))
    }

    pub fn fatal(&self, fields: Value, message: impl Into<String>) -> Result<(), ValidationError> {
        self.log(Level::Fatal, LogRecord::new(message).with_fields(fields))
    }
}

/// Every logger built from a schema, plus the flush workers they feed.
#[derive(Debug)]
pub struct Loggers {
    loggers: BTreeMap<String, Logger>,
    workers: Vec<FlushHandle>,
}

impl Loggers {
    pub(crate) fn new(loggers: BTreeMap<String, Logger>, workers: Vec<FlushHandle>) -> Self {
        Self { loggers, workers }
    }

    /// The logger registered under `key`.
    pub fn get(&self, key: &str) -> Option<&Logger> {
        self.loggers.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.loggers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Drain and stop every flush worker, sharing one `timeout` budget.
    ///
    /// Every worker is asked to stop even if an earlier one fails; the first
    /// failure is returned.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), WorkerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut first_err = None;

        for worker in &self.workers {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if let Err(err) = worker.shutdown(remaining).await {
                error!(worker = worker.name(), %err, "flush worker shutdown failed");
                first_err.get_or_insert(err);
            }
        }

        debug!(workers = self.workers.len(), "loggers shut down");
        first_err.map_or(Ok(()), Err)
    }
}
