//! Collaborator traits of the inventory service.
//!
//! Implementations are constructed at process start and handed to
//! [`crate::InventoryItemService::new`].

use async_trait::async_trait;
use common::{ConversationId, OrderNumber, ProductId};
use inventory_store::{StoreError, Version};

use crate::context::RequestContext;
use crate::error::DomainError;
use crate::events::InventoryEvent;
use crate::item::InventoryItem;

/// Loads and saves inventory items by product id.
#[async_trait]
pub trait InventoryItemRepository: Send + Sync {
    /// Returns None if the product has no inventory item.
    async fn with_product_id(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<InventoryItem>, StoreError>;

    /// Writes the item, conditional on the stored version still being
    /// `item.version()`. Returns the new version.
    ///
    /// Fails with `StoreError::ConcurrencyConflict` if another writer got there
    /// first; the caller is expected to reload and retry.
    async fn update(&self, item: &InventoryItem) -> Result<Version, StoreError>;
}

/// Remembers which products an order touched, between reservation and dispatch.
#[async_trait]
pub trait OrderCache: Send + Sync {
    /// Products recorded for the order. Empty on a miss or an expired entry.
    async fn products(&self, order_number: &OrderNumber) -> Result<Vec<ProductId>, StoreError>;

    /// Records the products of an order, overwriting any previous entry.
    async fn store(
        &self,
        order_number: &OrderNumber,
        products: &[ProductId],
    ) -> Result<(), StoreError>;
}

/// Emits domain events to the outside world.
///
/// Fire-and-forget: implementations log delivery failures and never report
/// them back, so a failed publish does not undo the mutation that preceded it.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        ctx: &RequestContext,
        event: InventoryEvent,
        conversation_id: Option<&ConversationId>,
    );
}

/// Source of the products known to the catalogue service.
#[async_trait]
pub trait ProductCatalogue: Send + Sync {
    async fn product_ids(&self) -> Result<Vec<ProductId>, DomainError>;
}
