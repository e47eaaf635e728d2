//! # log-schema
//!
//! Data model and startup configuration for catlog. This crate loads the
//! per-logger category schema, defines the [`LogEntry`] shape every transport
//! consumes, and checks entry fields against the schema before dispatch.
//!
//! ## Quick start
//!
//! ```rust
//! use log_schema::{loader, FieldValidator, Level};
//!
//! let schema = loader::load_schema_from_str(r#"
//! auditLogger:
//!   category: usage
//!   required:
//!     error: [userId]
//! "#).unwrap();
//!
//! let validator = FieldValidator::new("auditLogger", schema.get("auditLogger").unwrap());
//! let err = validator.validate(Level::Error, &serde_json::json!({})).unwrap_err();
//! assert_eq!(err.missing, vec!["userId"]);
//! ```

mod entry;
mod level;
pub mod loader;
mod schema;
pub mod validator;

pub use entry::{LogEntry, LogRecord};
pub use level::{Category, Level, UnknownVariant};
pub use loader::ConfigurationError;
pub use schema::{CategorySchema, LoggerSchema};
pub use validator::{FieldValidator, ValidationError};
