//! Destination path templates with `{category}`, `{level}` and `{date}`
//! placeholders.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log_schema::{Category, Level};

/// Default per-level dated file layout.
pub const DEFAULT_FILE_TEMPLATE: &str = "{category}/{level}/{level}-{date}.log";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("destination template must not be empty")]
    Empty,

    #[error("unknown placeholder '{{{0}}}' in destination template")]
    UnknownPlaceholder(String),

    #[error("unterminated placeholder in destination template '{0}'")]
    Unterminated(String),

    #[error("destination template '{0}' must be a relative path")]
    Absolute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Category,
    Level,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed destination template, resolved relative to a log root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl DestinationTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if raw.is_empty() {
            return Err(TemplateError::Empty);
        }
        if Path::new(raw).is_absolute() {
            return Err(TemplateError::Absolute(raw.to_string()));
        }

        let mut parts = Vec::new();
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::Unterminated(raw.to_string()))?;
            let placeholder = match &after[..close] {
                "category" => Placeholder::Category,
                "level" => Placeholder::Level,
                "date" => Placeholder::Date,
                other => return Err(TemplateError::UnknownPlaceholder(other.to_string())),
            };
            parts.push(Part::Placeholder(placeholder));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Substitute placeholders and join the result onto `root`.
    pub fn resolve(&self, root: &Path, category: Category, level: Level, date: NaiveDate) -> PathBuf {
        let mut relative = String::with_capacity(self.raw.len() + 16);
        for part in &self.parts {
            match part {
                Part::Literal(text) => relative.push_str(text),
                Part::Placeholder(Placeholder::Category) => relative.push_str(category.as_str()),
                Part::Placeholder(Placeholder::Level) => relative.push_str(level.as_str()),
                Part::Placeholder(Placeholder::Date) => {
                    relative.push_str(&date.format("%Y-%m-%d").to_string())
                }
            }
        }
        root.join(relative)
    }
}

impl Default for DestinationTemplate {
    /// The [`DEFAULT_FILE_TEMPLATE`] layout.
    ///
    /// # Panics
    ///
    /// Panics if the built-in template fails to parse (it never does).
    fn default() -> Self {
        Self::parse(DEFAULT_FILE_TEMPLATE).expect("built-in template must parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn default_is_the_dated_layout() {
        assert_eq!(DestinationTemplate::default().as_str(), DEFAULT_FILE_TEMPLATE);
    }

    #[test]
    fn resolves_default_layout() {
        let template = DestinationTemplate::default();
        let path = template.resolve(Path::new("./logs"), Category::Usage, Level::Error, date());
        assert_eq!(path, Path::new("./logs/usage/error/error-2026-10-16.log"));
    }

    #[test]
    fn resolves_literal_only_template() {
        let template = DestinationTemplate::parse("archive/all.log").unwrap();
        let path = template.resolve(Path::new("/var/log"), Category::System, Level::Info, date());
        assert_eq!(path, Path::new("/var/log/archive/all.log"));
    }

    #[test]
    fn rejects_unknown_placeholder() {
        assert_eq!(
            DestinationTemplate::parse("{category}/{host}.log"),
            Err(TemplateError::UnknownPlaceholder("host".to_string()))
        );
    }

    #[test]
    fn rejects_unterminated_placeholder() {
        assert!(matches!(
            DestinationTemplate::parse("{category/x.log"),
            Err(TemplateError::Unterminated(_))
        ));
    }

    #[test]
    fn rejects_absolute_and_empty() {
        assert_eq!(DestinationTemplate::parse(""), Err(TemplateError::Empty));
        assert!(matches!(
            DestinationTemplate::parse("/tmp/{level}.log"),
            Err(TemplateError::Absolute(_))
        ));
    }
}
