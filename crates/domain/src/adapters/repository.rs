//! Inventory item repository backed by an [`InventoryTable`].

use async_trait::async_trait;
use common::ProductId;
use inventory_store::{InventoryItemRecord, InventoryTable, PutOptions, StoreError, Version};

use crate::item::InventoryItem;
use crate::ports::InventoryItemRepository;

/// Maps inventory items onto table records with versioned writes.
#[derive(Debug, Clone)]
pub struct TableInventoryItemRepository<T> {
    table: T,
}

impl<T: InventoryTable> TableInventoryItemRepository<T> {
    pub fn new(table: T) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &T {
        &self.table
    }
}

#[async_trait]
impl<T: InventoryTable> InventoryItemRepository for TableInventoryItemRepository<T> {
    #[tracing::instrument(skip(self))]
    async fn with_product_id(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let item = self.table.get_item(product_id).await?.map(InventoryItem::from);
        tracing::debug!(found = item.is_some(), "inventory item lookup");
        Ok(item)
    }

    #[tracing::instrument(skip(self, item), fields(product_id = %item.product_id(), expected_version = %item.version()))]
    async fn update(&self, item: &InventoryItem) -> Result<Version, StoreError> {
        let record = InventoryItemRecord::from(item);
        self.table
            .put_item(record, PutOptions::expect_version(item.version()))
            .await
    }
}
