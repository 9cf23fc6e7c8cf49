//! Per-message processing state machine.

use serde::{Deserialize, Serialize};

/// The state of one inbound message as it moves through the ACL.
///
/// State transitions:
/// ```text
/// Received ──► Decoded ──► Dispatched ──┬──► Succeeded
///    │            │                     ├──► RetryableFailure
///    │            │                     └──► Skipped
///    └────────────┴──► RetryableFailure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessageState {
    /// Taken from the batch, not yet decoded.
    #[default]
    Received,

    /// Envelope and payload decoded.
    Decoded,

    /// Handed to the domain operation.
    Dispatched,

    /// Handled (terminal state).
    Succeeded,

    /// Must be redelivered (terminal state).
    RetryableFailure,

    /// Acknowledged without effect; redelivery cannot help (terminal state).
    Skipped,
}

impl MessageState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: MessageState) -> bool {
        use MessageState::*;
        matches!(
            (self, next),
            (Received, Decoded)
                | (Received, RetryableFailure)
                | (Decoded, Dispatched)
                | (Decoded, RetryableFailure)
                | (Dispatched, Succeeded)
                | (Dispatched, RetryableFailure)
                | (Dispatched, Skipped)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageState::Succeeded | MessageState::RetryableFailure | MessageState::Skipped
        )
    }

    /// Returns true if the message must be reported as a batch-item failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, MessageState::RetryableFailure)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Received => "received",
            MessageState::Decoded => "decoded",
            MessageState::Dispatched => "dispatched",
            MessageState::Succeeded => "succeeded",
            MessageState::RetryableFailure => "retryable_failure",
            MessageState::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
