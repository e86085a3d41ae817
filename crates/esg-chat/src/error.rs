//! Error types for the dialogue core.

use esg_core::error::EsgError;

/// Errors from session management and client construction. Submitting an
/// utterance never produces one.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("remote client error: {0}")]
    Remote(String),
    #[error("knowledge base error: {0}")]
    Knowledge(String),
}

impl From<EsgError> for ChatError {
    fn from(err: EsgError) -> Self {
        ChatError::Knowledge(err.to_string())
    }
}
