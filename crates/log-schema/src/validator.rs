//! Required-field validation for log entries.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::level::Level;
use crate::schema::{CategorySchema, LoggerSchema};

/// An entry is missing fields its logger's schema requires at that level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("logger '{logger}' at level '{level}' is missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    pub logger: String,
    pub level: Level,
    /// Missing names, in the order the schema declares them.
    pub missing: Vec<String>,
}

/// Precomputed required-field table for one logger.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    logger: String,
    required: BTreeMap<Level, Vec<String>>,
}

impl FieldValidator {
    pub fn new(logger: impl Into<String>, schema: &LoggerSchema) -> Self {
        Self {
            logger: logger.into(),
            required: schema.required.clone(),
        }
    }

    pub fn logger(&self) -> &str {
        &self.logger
    }

    /// Check `fields` against the names required at `level`.
    pub fn validate(&self, level: Level, fields: &Value) -> Result<(), ValidationError> {
        let required = self.required.get(&level).map(Vec::as_slice).unwrap_or(&[]);
        check(&self.logger, level, required, fields)
    }
}

/// Keyed form of [`FieldValidator::validate`]. Unknown logger keys have no
/// requirements.
pub fn validate(
    schema: &CategorySchema,
    logger: &str,
    level: Level,
    fields: &Value,
) -> Result<(), ValidationError> {
    check(logger, level, schema.required_fields(logger, level), fields)
}

fn check(
    logger: &str,
    level: Level,
    required: &[String],
    fields: &Value,
) -> Result<(), ValidationError> {
    if required.is_empty() {
        return Ok(());
    }

    let missing: Vec<String> = match fields.as_object() {
        Some(map) => required
            .iter()
            .filter(|name| !map.contains_key(name.as_str()))
            .cloned()
            .collect(),
        None => required.to_vec(),
    };

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            logger: logger.to_string(),
            level,
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::level::Category;

    fn audit_validator() -> FieldValidator {
        let schema = LoggerSchema::new(Category::Usage)
            .with_required(Level::Error, ["userId", "requestId"])
            .with_required(Level::Warn, ["userId"]);
        FieldValidator::new("auditLogger", &schema)
    }

    #[test]
    fn all_required_present_succeeds() {
        let v = audit_validator();
        assert!(v
            .validate(Level::Error, &json!({"userId": "42", "requestId": "r-1", "extra": true}))
            .is_ok());
    }

    #[test]
    fn each_omitted_field_is_named_exactly() {
        let v = audit_validator();
        let required = ["userId", "requestId"];

        for omitted in required {
            let mut fields = serde_json::Map::new();
            for name in required.iter().filter(|n| **n != omitted) {
                fields.insert(name.to_string(), json!("x"));
            }
            let err = v.validate(Level::Error, &Value::Object(fields)).unwrap_err();
            assert_eq!(err.missing, vec![omitted.to_string()]);
            assert_eq!(err.level, Level::Error);
        }
    }

    #[test]
    fn missing_names_keep_schema_order() {
        let v = audit_validator();
        let err = v.validate(Level::Error, &json!({})).unwrap_err();
        assert_eq!(err.missing, vec!["userId", "requestId"]);
        assert_eq!(
            err.to_string(),
            "logger 'auditLogger' at level 'error' is missing required fields: userId, requestId"
        );
    }

    #[test]
    fn non_object_fields_miss_everything() {
        let v = audit_validator();
        for fields in [Value::Null, json!("userId"), json!(["userId"]), json!(3)] {
            let err = v.validate(Level::Error, &fields).unwrap_err();
            assert_eq!(err.missing, vec!["userId", "requestId"]);
        }
    }

    #[test]
    fn no_requirements_accepts_anything() {
        let v = audit_validator();
        for fields in [Value::Null, json!({}), json!("text"), json!({"a": 1})] {
            assert!(v.validate(Level::Info, &fields).is_ok());
        }
    }

    #[test]
    fn keyed_validate_uses_schema() {
        let mut loggers = BTreeMap::new();
        loggers.insert(
            "auditLogger".to_string(),
            LoggerSchema::new(Category::Usage).with_required(Level::Error, ["userId"]),
        );
        let schema = CategorySchema::new(loggers);

        let err = validate(&schema, "auditLogger", Level::Error, &json!({})).unwrap_err();
        assert_eq!(err.missing, vec!["userId"]);
        assert!(validate(&schema, "auditLogger", Level::Error, &json!({"userId": "42"})).is_ok());
        assert!(validate(&schema, "unknown", Level::Error, &json!({})).is_ok());
    }
}
