//! # Poll Errors
//!
//! Error types for the poll core.

use thiserror::Error;
use uuid::Uuid;

/// Result type for poll operations
pub type PollResult<T> = Result<T, PollError>;

/// Poll core errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    // ==================
    // Lookup Errors
    // ==================
    /// Unknown poll
    #[error("Poll not found: {0}")]
    NotFound(Uuid),

    // ==================
    // Admission Rejections
    // ==================
    /// Voting window has ended
    #[error("Poll is closed")]
    PollClosed,

    /// Voter already has a vote recorded for this poll
    #[error("Already voted in this poll")]
    AlreadyVoted,

    /// Option does not belong to this poll
    #[error("Invalid option: {0}")]
    InvalidOption(Uuid),

    // ==================
    // Creation Errors
    // ==================
    /// Malformed creation request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ==================
    // Operational Errors
    // ==================
    /// Could not acquire the poll within the bounded wait; safe to retry
    #[error("Poll is busy, retry")]
    Transient,

    /// Internal fault, isolated to the affected poll
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PollError {
    /// Stable reason code surfaced to clients
    pub fn reason_code(&self) -> &'static str {
        match self {
            PollError::NotFound(_) => "not_found",
            PollError::PollClosed => "poll_closed",
            PollError::AlreadyVoted => "already_voted",
            PollError::InvalidOption(_) => "invalid_option",
            PollError::InvalidArgument(_) => "invalid_argument",
            PollError::Transient => "transient",
            PollError::Internal(_) => "internal",
        }
    }

    /// Whether the caller may retry the operation as-is
    pub fn is_transient(&self) -> bool {
        matches!(self, PollError::Transient)
    }
}
