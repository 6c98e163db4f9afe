use serde::{Deserialize, Serialize};

/// Data validation rule attached to a column by the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Dropdown with a fixed option list (the service's ONE_OF_LIST condition).
    Dropdown(Vec<String>),
    /// Checkbox (the service's BOOLEAN condition).
    Checkbox,
}
