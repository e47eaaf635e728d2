use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::schema::CategorySchema;

/// Startup failures while loading a [`CategorySchema`].
///
/// Every variant is fatal: the process is expected to exit non-zero rather
/// than run with a partial schema.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to read schema file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("schema declares no loggers")]
    Empty,

    #[error("logger key must not be empty")]
    EmptyLoggerKey,

    #[error("logger '{logger}': required field name for level '{level}' must not be empty")]
    EmptyFieldName { logger: String, level: String },

    #[error("logger '{logger}': duplicate required field '{field}' for level '{level}'")]
    DuplicateField {
        logger: String,
        level: String,
        field: String,
    },

    #[error("logger '{logger}': invalid redact path '{path}'")]
    InvalidRedactPath { logger: String, path: String },
}

/// Load a [`CategorySchema`] from a YAML (or JSON) file on disk.
pub fn load_schema(path: impl AsRef<Path>) -> Result<CategorySchema, ConfigurationError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_schema_from_str(&contents)
}

/// Parse and validate a [`CategorySchema`] from a string.
pub fn load_schema_from_str(contents: &str) -> Result<CategorySchema, ConfigurationError> {
    let schema: Option<CategorySchema> = serde_yml::from_str(contents)?;
    let schema = schema.ok_or(ConfigurationError::Empty)?;
    validate(&schema)?;
    Ok(schema)
}

/// Run post-deserialization checks.
pub fn validate(schema: &CategorySchema) -> Result<(), ConfigurationError> {
    if schema.is_empty() {
        return Err(ConfigurationError::Empty);
    }

    for (key, entry) in schema.iter() {
        if key.trim().is_empty() {
            return Err(ConfigurationError::EmptyLoggerKey);
        }

        for (level, fields) in &entry.required {
            let mut seen = HashSet::new();
            for field in fields {
                if field.is_empty() {
                    return Err(ConfigurationError::EmptyFieldName {
                        logger: key.to_string(),
                        level: level.to_string(),
                    });
                }
                if !seen.insert(field) {
                    return Err(ConfigurationError::DuplicateField {
                        logger: key.to_string(),
                        level: level.to_string(),
                        field: field.clone(),
                    });
                }
            }
        }

        for path in &entry.redact_fields {
            if path.split('.').any(str::is_empty) {
                return Err(ConfigurationError::InvalidRedactPath {
                    logger: key.to_string(),
                    path: path.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::level::{Category, Level};

    #[test]
    fn load_minimal_schema() {
        let yaml = r#"
auditLogger:
  category: usage
  required:
    error: [userId]
"#;
        let schema = load_schema_from_str(yaml).unwrap();
        assert_eq!(schema.len(), 1);
        let entry = schema.get("auditLogger").unwrap();
        assert_eq!(entry.category, Category::Usage);
        assert_eq!(entry.required_for(Level::Error), ["userId"]);
    }

    #[test]
    fn reject_empty_document() {
        let err = load_schema_from_str("").unwrap_err();
        assert!(
            matches!(err, ConfigurationError::Empty | ConfigurationError::Parse(_)),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reject_empty_mapping() {
        let err = load_schema_from_str("{}").unwrap_err();
        assert!(matches!(err, ConfigurationError::Empty), "unexpected error: {err}");
    }

    #[test]
    fn reject_malformed_yaml() {
        let err = load_schema_from_str("auditLogger: [category").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)), "unexpected error: {err}");
    }

    #[test]
    fn reject_duplicate_required_field() {
        let yaml = r#"
auditLogger:
  category: usage
  required:
    error: [userId, userId]
"#;
        let err = load_schema_from_str(yaml).unwrap_err();
        assert!(
            err.to_string().contains("duplicate required field 'userId'"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reject_empty_field_name() {
        let yaml = r#"
auditLogger:
  category: usage
  required:
    info: [""]
"#;
        let err = load_schema_from_str(yaml).unwrap_err();
        assert!(
            err.to_string().contains("must not be empty"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reject_malformed_redact_path() {
        let yaml = r#"
auditLogger:
  category: usage
  redactFields: ["card..number"]
"#;
        let err = load_schema_from_str(yaml).unwrap_err();
        assert!(
            matches!(err, ConfigurationError::InvalidRedactPath { ref path, .. } if path == "card..number"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn reject_empty_logger_key() {
        let yaml = r#"
"":
  category: system
"#;
        let err = load_schema_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyLoggerKey), "unexpected error: {err}");
    }

    #[test]
    fn load_from_nonexistent_file() {
        let err = load_schema("/does/not/exist.yaml").unwrap_err();
        assert!(
            err.to_string().contains("failed to read schema file"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"loginLogger": {{"category": "authentication", "redactFields": ["password"]}}}}"#
        )
        .unwrap();

        let schema = load_schema(file.path()).unwrap();
        let entry = schema.get("loginLogger").unwrap();
        assert_eq!(entry.category, Category::Authentication);
        assert_eq!(entry.redact_fields, vec!["password"]);
    }
}
