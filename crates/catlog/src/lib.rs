//! Categorized, schema-validated structured logging.
//!
//! A [`CategorySchema`](log_schema::CategorySchema) names every logger an
//! application may use, its category, the fields each level requires and
//! the fields to mask. [`LoggerFactory`] turns that schema plus a
//! [`TransportConfig`](config::TransportConfig) into a set of [`Logger`]s
//! that validate, redact and route each entry to console, dated files and a
//! buffered, rotating, gzip-compressed archive.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use catlog::config::TransportConfig;
//! use catlog::LoggerFactory;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = log_schema::loader::load_schema("schema.yaml")?;
//! let loggers = LoggerFactory::new(TransportConfig::default()).build(&schema)?;
//!
//! if let Some(audit) = loggers.get("auditLogger") {
//!     audit.error(json!({"userId": 42}), "quota exceeded")?;
//! }
//!
//! loggers.shutdown(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod factory;
mod logger;

pub use factory::{BuildError, LoggerFactory};
pub use logger::{Logger, Loggers};

pub use log_schema::{Category, Level, LogRecord, ValidationError};
