use std::path::PathBuf;

/// `tracing` target for sink and worker failures. Failures on one transport
/// are reported here and never returned to the logging caller.
pub const DIAGNOSTIC_TARGET: &str = "catlog::diagnostic";

/// Errors that can occur while a single transport persists or displays an
/// entry.
#[derive(Debug, thiserror::Error)]
pub enum SinkWriteError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize log entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write log output: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to rotate {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("flush worker unavailable: {0}")]
    Worker(#[from] WorkerError),
}

/// Failures of a buffering flush worker as seen from a [`FlushHandle`](crate::FlushHandle).
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("flush worker has stopped")]
    Closed,

    #[error("flush worker did not drain within {0:?}")]
    ShutdownTimeout(std::time::Duration),
}
