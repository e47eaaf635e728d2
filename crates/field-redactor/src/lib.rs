//! # field-redactor
//!
//! Masks sensitive values in log entries before they reach any transport.
//!
//! The crate is organised around two layers:
//!
//! 1. **[`path`]** -- parses dot-paths (`card.number`, `tokens.0`) once and
//!    walks a JSON field tree to the addressed value.
//! 2. **[`redactor`]** -- applies a logger's set of paths to a
//!    [`LogEntry`](log_schema::LogEntry), writing [`REDACTED`] over each
//!    value found.
//!
//! ## Quick start
//!
//! ```rust
//! use field_redactor::{Redactor, REDACTED};
//! use log_schema::{Category, Level, LogEntry};
//!
//! let redactor = Redactor::new(["password"]).unwrap();
//! let mut fields = serde_json::Map::new();
//! fields.insert("password".into(), "hunter2".into());
//!
//! let entry = LogEntry::new(Level::Info, Category::Authentication, "login").with_fields(fields);
//! let entry = redactor.apply(entry);
//! assert_eq!(entry.fields["password"], REDACTED);
//! ```

pub mod path;
pub mod redactor;

pub use path::{DotPath, PathError};
pub use redactor::{Redactor, REDACTED};
