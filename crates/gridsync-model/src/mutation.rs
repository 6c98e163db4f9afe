use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::field_type::ParseFieldTypeError;

/// The kind of deferred row write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Append,
    Update,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Append => "append",
            MutationKind::Update => "update",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = ParseFieldTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(MutationKind::Append),
            "update" => Ok(MutationKind::Update),
            other => Err(ParseFieldTypeError(other.to_string())),
        }
    }
}

/// A row write that failed with a transient error and awaits background replay.
///
/// Entries live in the durable queue from the moment the remote write first
/// fails until a replay succeeds. They are never evicted on repeated failure;
/// `retry_count` and `last_error` only record the history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Monotonic id assigned on insert.
    pub id: i64,
    pub kind: MutationKind,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// Data-relative row index; required for `Update`, absent for `Append`.
    pub row_index: Option<usize>,
    /// Cell payload; `None` entries keep the remote cell untouched-as-blank.
    pub row: Vec<Option<String>>,
    pub created_at_ms: i64,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

/// Insert form of [`PendingMutation`], before an id is assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMutation {
    pub kind: MutationKind,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub row_index: Option<usize>,
    pub row: Vec<Option<String>>,
}

impl NewMutation {
    pub fn append(spreadsheet_id: &str, sheet_name: &str, row: Vec<Option<String>>) -> Self {
        Self {
            kind: MutationKind::Append,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            row_index: None,
            row,
        }
    }

    pub fn update(
        spreadsheet_id: &str,
        sheet_name: &str,
        row_index: usize,
        row: Vec<Option<String>>,
    ) -> Self {
        Self {
            kind: MutationKind::Update,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            row_index: Some(row_index),
            row,
        }
    }
}
