use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::level::{Category, Level};

/// The shape an upstream layer attaches to a unit of work before handing it
/// to a logger: everything except the level, category and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub message: String,
    /// Free-form structured fields. Usually a JSON object; `null` means
    /// "no fields".
    #[serde(default)]
    pub fields: Value,
}

impl LogRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A single structured log entry, as seen by transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: Level,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub message: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl LogEntry {
    /// Create an entry stamped with the current UTC time.
    pub fn new(level: Level, category: Category, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            category,
            code: None,
            context: None,
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Build an entry from an upstream [`LogRecord`].
    ///
    /// `null` fields become an empty map. A non-object value is kept under
    /// the single key `"value"` so nothing the caller passed is dropped.
    pub fn from_record(level: Level, category: Category, record: LogRecord) -> Self {
        let fields = match record.fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        Self {
            timestamp: chrono::Utc::now(),
            level,
            category,
            code: record.code,
            context: record.context,
            message: record.message,
            fields,
        }
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    /// Serialize as one newline-terminated JSON object.
    pub fn to_json_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_record_keeps_object_fields() {
        let record = LogRecord::new("login")
            .with_code("AUTH_001")
            .with_context("session")
            .with_fields(json!({"userId": "42"}));
        let entry = LogEntry::from_record(Level::Info, Category::Authentication, record);

        assert_eq!(entry.code.as_deref(), Some("AUTH_001"));
        assert_eq!(entry.context.as_deref(), Some("session"));
        assert_eq!(entry.message, "login");
        assert_eq!(entry.fields.get("userId"), Some(&json!("42")));
    }

    #[test]
    fn from_record_null_fields_become_empty() {
        let entry = LogEntry::from_record(Level::Debug, Category::System, LogRecord::new("boot"));
        assert!(entry.fields.is_empty());
    }

    #[test]
    fn from_record_wraps_scalar_fields() {
        let record = LogRecord::new("odd").with_fields(json!(7));
        let entry = LogEntry::from_record(Level::Warn, Category::Usage, record);
        assert_eq!(entry.fields.get("value"), Some(&json!(7)));
    }

    #[test]
    fn json_line_is_newline_terminated() {
        let entry = LogEntry::new(Level::Error, Category::Validation, "bad input");
        let line = entry.to_json_line().unwrap();
        assert_eq!(line.last(), Some(&b'\n'));

        let value: Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["category"], "validation");
        assert!(value.get("code").is_none());
    }
}
