//! ACL error types.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur while handling an inbound message.
#[derive(Debug, Error)]
pub enum AclError {
    /// The message body or event payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// No handler exists for the detail-type.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The inventory operation failed.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl AclError {
    /// Returns true if the message should be reported as a batch-item failure.
    ///
    /// Undecodable and unknown messages are reported so the queue eventually
    /// dead-letters them. Domain errors are reported only when redelivery
    /// may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AclError::Decode(_) | AclError::UnknownEventType(_) => true,
            AclError::Domain(err) => err.is_retryable(),
        }
    }
}

/// Convenience type alias for ACL results.
pub type Result<T> = std::result::Result<T, AclError>;
