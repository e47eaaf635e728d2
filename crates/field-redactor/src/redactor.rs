//! Masks configured sensitive paths in a [`LogEntry`] before any transport
//! sees it.

use log_schema::LogEntry;
use serde_json::{Map, Value};
use tracing::trace;

use crate::path::{DotPath, PathError};

/// Replacement written over every redacted value.
pub const REDACTED: &str = "[Redacted]";

/// Redaction filter for a single logger.
///
/// Paths are parsed once at construction. Applying the filter is
/// deterministic and idempotent: a value already equal to [`REDACTED`] is
/// simply overwritten with the same sentinel.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    paths: Vec<DotPath>,
}

impl Redactor {
    /// Parse `paths` into a redactor. Any malformed path fails the whole
    /// construction.
    pub fn new<I, S>(paths: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|raw| DotPath::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[DotPath] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Return `entry` with every configured path that is present in its
    /// fields replaced by [`REDACTED`].
    pub fn apply(&self, mut entry: LogEntry) -> LogEntry {
        self.redact_fields(&mut entry.fields);
        entry
    }

    /// In-place form of [`apply`](Self::apply). Returns how many values were
    /// masked.
    pub fn redact_fields(&self, fields: &mut Map<String, Value>) -> usize {
        let mut masked = 0;
        for path in &self.paths {
            if let Some(value) = path.resolve_in_mut(fields) {
                *value = Value::String(REDACTED.to_string());
                masked += 1;
            }
        }
        if masked > 0 {
            trace!(masked, "redacted entry fields");
        }
        masked
    }
}
