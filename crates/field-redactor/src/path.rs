//! Parsed dot-paths into a JSON field tree.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

/// Errors produced while parsing a [`DotPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("redact path must not be empty")]
    Empty,

    #[error("redact path '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// A pre-split dot-path such as `card.number` or `tokens.0`.
///
/// Segments address object keys. When the value being walked is an array,
/// a segment that parses as an index addresses that element instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotPath {
    raw: String,
    segments: Vec<String>,
}

impl DotPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk `root` and return a mutable reference to the addressed value, or
    /// `None` if any segment is absent.
    pub fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        walk(root, &self.segments)
    }

    /// Same as [`resolve_mut`](Self::resolve_mut), rooted at an entry's field
    /// map rather than a [`Value`].
    pub fn resolve_in_mut<'a>(&self, fields: &'a mut Map<String, Value>) -> Option<&'a mut Value> {
        let (first, rest) = self.segments.split_first()?;
        walk(fields.get_mut(first)?, rest)
    }
}

fn walk<'a>(start: &'a mut Value, segments: &[String]) -> Option<&'a mut Value> {
    segments.iter().try_fold(start, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |index| items.get_mut(index)),
        _ => None,
    })
}

impl FromStr for DotPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
