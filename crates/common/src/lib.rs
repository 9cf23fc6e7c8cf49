//! Shared types for the inventory service.

pub mod envelope;
pub mod types;

pub use envelope::CloudEvent;
pub use types::{ConversationId, EventId, OrderNumber, ProductId};
