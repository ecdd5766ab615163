//! Error kinds surfaced by the reconciliation core.
//!
//! Binary-level glue (config, CLI, server start-up) uses `anyhow`; everything a
//! caller of the journal needs to pattern-match on is a [`JournalError`].

/// Errors produced while parsing, reconciling, or storing journal entries.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// The external parser did not return a usable structured record.
    #[error("parse failure: {0}")]
    ParseFailure(String),
    /// An append, purge, query, or session write failed. Safe to retry.
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// A structured record is missing a required field.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    /// The submitted prompt was blank.
    #[error("prompt must not be empty")]
    EmptyPrompt,
    /// A new entry was submitted while a clarification is still open.
    #[error("a clarification is pending for this session; confirm it first")]
    ClarificationPending,
    /// `confirm` was called with nothing to confirm.
    #[error("no clarification is pending for this session")]
    NothingPending,
    /// The decisions do not line up with the flagged items.
    #[error("invalid decision: {0}")]
    InvalidDecision(String),
    /// An event arrived that the current workflow state cannot accept.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

impl JournalError {
    /// `true` when re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
