use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::level::{Category, Level};

/// Process-wide logging schema: one [`LoggerSchema`] per logger key.
///
/// Deserialized from a mapping of logger key to entry. Keys are kept in a
/// [`BTreeMap`] so loggers are always constructed in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySchema {
    loggers: BTreeMap<String, LoggerSchema>,
}

impl CategorySchema {
    pub fn new(loggers: BTreeMap<String, LoggerSchema>) -> Self {
        Self { loggers }
    }

    /// Look up the schema entry for `key`.
    pub fn get(&self, key: &str) -> Option<&LoggerSchema> {
        self.loggers.get(key)
    }

    /// Iterate over `(logger key, entry)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoggerSchema)> {
        self.loggers.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    /// Required field names for `key` at `level`. Unknown keys and levels
    /// without requirements yield an empty slice.
    pub fn required_fields(&self, key: &str, level: Level) -> &[String] {
        self.get(key)
            .map(|entry| entry.required_for(level))
            .unwrap_or(&[])
    }
}

/// Schema entry for a single logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSchema {
    /// Category the logger's entries are classified under.
    pub category: Category,
    /// Field names that must be present, per level. Order is preserved so
    /// validation errors list names as the schema declares them.
    #[serde(default)]
    pub required: BTreeMap<Level, Vec<String>>,
    /// Dot-paths into the entry fields whose values are masked before any
    /// transport sees them.
    #[serde(default, rename = "redactFields", alias = "redact_fields")]
    pub redact_fields: Vec<String>,
}

impl LoggerSchema {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            required: BTreeMap::new(),
            redact_fields: Vec::new(),
        }
    }

    /// Builder-style helper to declare required fields for a level.
    pub fn with_required<I, S>(mut self, level: Level, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required
            .insert(level, fields.into_iter().map(Into::into).collect());
        self
    }

    /// Builder-style helper to declare redacted paths.
    pub fn with_redact_fields<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_fields = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_for(&self, level: Level) -> &[String] {
        self.required.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_entry() {
        let yaml = r#"
systemLogger:
  category: system
"#;
        let schema: CategorySchema = serde_yml::from_str(yaml).unwrap();
        let entry = schema.get("systemLogger").unwrap();
        assert_eq!(entry.category, Category::System);
        assert!(entry.required.is_empty());
        assert!(entry.redact_fields.is_empty());
    }

    #[test]
    fn deserialize_full_entry() {
        let yaml = r#"
authLogger:
  category: authentication
  required:
    warn: [userId]
    error: [userId, ip]
  redactFields:
    - password
    - card.number
"#;
        let schema: CategorySchema = serde_yml::from_str(yaml).unwrap();
        let entry = schema.get("authLogger").unwrap();
        assert_eq!(entry.category, Category::Authentication);
        assert_eq!(entry.required_for(Level::Warn), ["userId"]);
        assert_eq!(entry.required_for(Level::Error), ["userId", "ip"]);
        assert!(entry.required_for(Level::Info).is_empty());
        assert_eq!(entry.redact_fields, vec!["password", "card.number"]);
    }

    #[test]
    fn deserialize_json_document() {
        let json = r#"{"auditLogger": {"category": "usage", "required": {"error": ["userId"]}}}"#;
        let schema: CategorySchema = serde_yml::from_str(json).unwrap();
        assert_eq!(schema.required_fields("auditLogger", Level::Error), ["userId"]);
    }

    #[test]
    fn snake_case_redact_alias_is_accepted() {
        let yaml = r#"
usageLogger:
  category: usage
  redact_fields: [token]
"#;
        let schema: CategorySchema = serde_yml::from_str(yaml).unwrap();
        assert_eq!(schema.get("usageLogger").unwrap().redact_fields, vec!["token"]);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let yaml = r#"
badLogger:
  category: billing
"#;
        assert!(serde_yml::from_str::<CategorySchema>(yaml).is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let yaml = r#"
badLogger:
  category: usage
  requried:
    error: [userId]
"#;
        assert!(serde_yml::from_str::<CategorySchema>(yaml).is_err());
    }

    #[test]
    fn required_fields_for_unknown_logger_is_empty() {
        let schema = CategorySchema::default();
        assert!(schema.required_fields("nobody", Level::Fatal).is_empty());
    }
}
