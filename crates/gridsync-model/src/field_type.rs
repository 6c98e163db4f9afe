use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic type assigned to a whole column.
///
/// Exactly one value per column index. `Formula` columns are read-only in
/// editors; the computed display value is fetched separately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Currency,
    Date,
    Boolean,
    Formula,
}

impl FieldType {
    /// Stable storage identifier, used as-is in SQLite columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Currency => "currency",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Formula => "formula",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown field type: {0}")]
pub struct ParseFieldTypeError(pub String);

impl FromStr for FieldType {
    type Err = ParseFieldTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "currency" => Ok(FieldType::Currency),
            "date" => Ok(FieldType::Date),
            "boolean" => Ok(FieldType::Boolean),
            "formula" => Ok(FieldType::Formula),
            other => Err(ParseFieldTypeError(other.to_string())),
        }
    }
}
