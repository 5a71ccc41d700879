//! Error taxonomy for the conversation server.
//!
//! Every error is scoped to the connection that caused it: handlers return
//! `ChatError`, the dispatcher logs it and reports it to the requester only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Stable machine-readable code sent in the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Authentication(_) => "authentication",
            ChatError::NotFound(_) => "not_found",
            ChatError::Unauthorized(_) => "unauthorized",
            ChatError::Timeout(_) => "timeout",
            ChatError::BadRequest(_) => "bad_request",
            ChatError::Internal(_) => "internal",
        }
    }

    /// Only store timeouts are worth retrying as-is.
    pub fn retryable(&self) -> bool {
        matches!(self, ChatError::Timeout(_))
    }

    /// Message safe to show the requesting client. Internal details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            ChatError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors raised by a `ConversationStore` implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store task failed: {0}")]
    Task(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ChatError::NotFound(what),
            other => ChatError::Internal(other.to_string()),
        }
    }
}
