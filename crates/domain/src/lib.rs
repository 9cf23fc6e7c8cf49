//! Domain layer of the inventory service.
//!
//! This crate provides:
//! - The `InventoryItem` aggregate with idempotent reserve, release and dispatch
//! - Outbound inventory events and the `RequestContext` they are traced with
//! - Collaborator traits for the repository, order cache, publisher and catalogue
//! - `InventoryItemService`, which runs the reservation saga steps

pub mod adapters;
pub mod context;
pub mod error;
pub mod events;
pub mod item;
pub mod ports;
pub mod response;
pub mod service;

pub use adapters::{
    InMemoryEventPublisher, InMemoryProductCatalogue, TableInventoryItemRepository,
    TableOrderCache,
};
pub use common::{ConversationId, OrderNumber, ProductId};
pub use context::RequestContext;
pub use error::DomainError;
pub use events::{DomainEvent, InventoryEvent};
pub use item::InventoryItem;
pub use ports::{EventPublisher, InventoryItemRepository, OrderCache, ProductCatalogue};
pub use response::{HandlerResponse, InventoryItemDto, UpdateStockRequest};
pub use service::{InventoryItemService, InventorySettings, ReservationFailure, ReservationOutcome};
