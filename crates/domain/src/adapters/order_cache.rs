//! Order cache backed by TTL-bounded records in an [`InventoryTable`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderNumber, ProductId};
use inventory_store::{InventoryTable, OrderRecord, StoreError};

use crate::ports::OrderCache;

/// Default lifetime of a cached order.
pub const DEFAULT_ORDER_TTL: Duration = Duration::from_secs(60 * 60);

/// Stores `ORDER_<orderNumber>` records that expire after a fixed TTL.
#[derive(Debug, Clone)]
pub struct TableOrderCache<T> {
    table: T,
    ttl: chrono::Duration,
}

impl<T: InventoryTable> TableOrderCache<T> {
    pub fn new(table: T, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self { table, ttl }
    }
}

#[async_trait]
impl<T: InventoryTable> OrderCache for TableOrderCache<T> {
    #[tracing::instrument(skip(self))]
    async fn products(&self, order_number: &OrderNumber) -> Result<Vec<ProductId>, StoreError> {
        match self.table.get_order(order_number).await? {
            Some(record) if !record.is_expired_at(Utc::now()) => {
                tracing::info!(product_count = record.products.len(), "order found");
                Ok(record.products)
            }
            Some(_) => {
                tracing::warn!("cached order expired");
                Ok(Vec::new())
            }
            None => {
                tracing::warn!("order not found");
                Ok(Vec::new())
            }
        }
    }

    #[tracing::instrument(skip(self, products), fields(product_count = products.len()))]
    async fn store(
        &self,
        order_number: &OrderNumber,
        products: &[ProductId],
    ) -> Result<(), StoreError> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);
        let record = OrderRecord::new(order_number, products.to_vec(), expires_at);
        self.table.put_order(record).await
    }
}
