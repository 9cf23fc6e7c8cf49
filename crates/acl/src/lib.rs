//! Anti-corruption layer for the inventory service.
//!
//! Inbound queue messages carry externally versioned events wrapped in an
//! event-bus envelope. This crate decodes them, maps each to exactly one
//! inventory operation, and reports per-message failures so the transport
//! redelivers only what failed.
//!
//! Handled detail-types:
//! 1. `product.productCreated.v1` announces the product to the ordering workflow
//! 2. `orders.orderCreated.v1` reserves stock and remembers the order
//! 3. `orders.orderCompleted.v1` dispatches the reserved stock

pub mod error;
pub mod events;
pub mod handler;
pub mod message;
pub mod processor;
pub mod state;

pub use error::AclError;
pub use events::{OrderCompletedEventV1, OrderCreatedEventV1, ProductCreatedEventV1};
pub use handler::ExternalEventHandler;
pub use message::{BatchItemFailure, BatchResponse, BusMessage, QueueMessage};
pub use processor::BatchProcessor;
pub use state::MessageState;
