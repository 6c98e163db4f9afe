use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-friendly representation of a raw sheet cell.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable storage.
/// At this layer a cell is either empty or opaque text; assigning a semantic
/// type to a whole column is the job of `gridsync-infer`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Empty / unset cell.
    #[default]
    Empty,
    /// Formatted display text as returned by the remote service.
    Text(String),
}

impl CellValue {
    /// Returns true if the value is [`CellValue::Empty`] or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// The trimmed textual content, or `""` for an empty cell.
    pub fn as_trimmed(&self) -> &str {
        match self {
            CellValue::Empty => "",
            CellValue::Text(s) => s.trim(),
        }
    }

    /// The raw textual content, or `""` for an empty cell.
    pub fn as_str(&self) -> &str {
        match self {
            CellValue::Empty => "",
            CellValue::Text(s) => s.as_str(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => CellValue::Text(s),
            None => CellValue::Empty,
        }
    }
}
