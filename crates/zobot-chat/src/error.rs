//! Error types for the chat engine.

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session id cannot be empty")]
    InvalidSessionId,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("knowledge lookup failed: {0}")]
    Knowledge(String),
}
