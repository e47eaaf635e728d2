//! Delivery side of catlog: routing entries to transports, writing dated and
//! rotating files, and batching writes through an isolated flush worker.
//!
//! # Architecture
//!
//! ```text
//! Logger ──> TransportRouter ──┬──> ConsoleTransport    (inline)
//!                              ├──> FileTransport       (inline, dated path)
//!                              ├──> RotatingTransport   (inline)
//!                              └──> BufferedTransport ──> flush worker ──> RotatingSink
//!                                                         (tokio task)
//! ```
//!
//! Every transport failure is isolated to that transport and reported as a
//! `tracing` event under [`DIAGNOSTIC_TARGET`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use log_schema::{Category, Level, LogEntry};
//! use log_transport::{flush, BufferedTransport, RotatingSink, RotationPolicy, Target, TransportRouter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = RotatingSink::open("logs/usage/archive/usage.log", RotationPolicy::default())?;
//! let (worker, _task) = flush::spawn("usage-archive", sink, flush::DEFAULT_FLUSH_INTERVAL);
//!
//! let router = TransportRouter::new(Category::Usage)
//!     .with_target(Target::new(Level::Warn, Arc::new(BufferedTransport::new(worker.clone()))));
//! router.dispatch(&LogEntry::new(Level::Error, Category::Usage, "quota exceeded"));
//!
//! worker.shutdown(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod console;
pub mod destination;
mod error;
pub mod file;
pub mod flush;
pub mod rotating;
mod router;
mod transport;

pub use console::ConsoleSink;
pub use destination::{DestinationTemplate, TemplateError, DEFAULT_FILE_TEMPLATE};
pub use error::{SinkWriteError, WorkerError, DIAGNOSTIC_TARGET};
pub use file::DatedFileSink;
pub use flush::{BatchSink, FlushHandle, FlushPhase, FlushScheduler};
pub use rotating::{RotatingSink, RotationPolicy};
pub use router::{Target, TransportRouter};
pub use transport::{
    BufferedTransport, ConsoleTransport, FileTransport, RotatingTransport, Transport,
};
