//! Pre-write conflict detection.
//!
//! Before overwriting a row the client compares the change token it held when
//! the row was loaded against the spreadsheet's current token. A mismatch is
//! surfaced as an explicit decision point so the caller can reload or keep
//! editing; it is never raised as an error, and there is no force-overwrite
//! path.

use crate::transport::SheetTransport;

/// Outcome of a conflict check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictCheck {
    /// Safe to write, or not enough information to say otherwise.
    Proceed,
    /// The sheet changed since it was loaded. Carries a user-facing message.
    Conflict(String),
}

/// A conflict exists only when both tokens are present and differ. A missing
/// token on either side, or a failure to fetch the current one, lets the
/// write proceed: detection must never block a write it cannot judge.
pub async fn check_conflict(
    transport: &dyn SheetTransport,
    spreadsheet_id: &str,
    loaded_token: Option<&str>,
) -> ConflictCheck {
    let Some(loaded) = loaded_token else {
        return ConflictCheck::Proceed;
    };

    let current = match transport.fetch_change_token(spreadsheet_id).await {
        Ok(token) => token,
        Err(err) => {
            log::warn!("conflict check skipped, token fetch failed: {err}");
            return ConflictCheck::Proceed;
        }
    };

    match current {
        Some(current) if current != loaded => ConflictCheck::Conflict(conflict_message()),
        _ => ConflictCheck::Proceed,
    }
}

fn conflict_message() -> String {
    "This sheet was modified since you loaded it. Reload to see the latest data before saving."
        .to_string()
}
