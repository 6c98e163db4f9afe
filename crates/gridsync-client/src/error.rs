//! Error taxonomy for remote sheet operations.
//!
//! Every failure a transport can report is folded into [`ApiError`] so that
//! callers make exactly one decision: retry later ([`ApiError::is_transient`])
//! or surface the message to the user.

use thiserror::Error;

/// Result alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// HTTP 429. Retrying immediately would make things worse.
    #[error("rate limited by the remote service; wait a moment and try again")]
    RateLimited,

    /// HTTP 403. The user cannot fix this by retrying.
    #[error("permission denied; ask the owner to share the spreadsheet")]
    PermissionDenied,

    /// The sheet changed remotely since the caller loaded it.
    #[error("edit conflict: {0}")]
    Conflict(String),

    /// Network trouble or a server-side failure (5xx, 408). Safe to retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A request the server rejected for good. Retrying will not help.
    #[error("{message}")]
    Fatal {
        status: Option<u16>,
        message: String,
    },

    /// Offline with nothing cached for the requested sheet.
    #[error("offline and no cached copy of this sheet is available")]
    CacheUnavailable,
}

impl ApiError {
    /// Classify an HTTP status code the way the sync queue expects:
    /// 5xx and 408 are retryable, everything else in 4xx is final.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => ApiError::RateLimited,
            403 => ApiError::PermissionDenied,
            408 => ApiError::Transient(message.into()),
            500..=599 => ApiError::Transient(message.into()),
            _ => ApiError::Fatal {
                status: Some(status),
                message: message.into(),
            },
        }
    }

    /// Build a transient error from an I/O-level failure (no HTTP status).
    pub fn io(message: impl Into<String>) -> Self {
        ApiError::Transient(message.into())
    }

    /// Whether a failed write should stay in the pending queue for replay.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }
}
