use async_trait::async_trait;

use crate::{InventoryItemRecord, OrderNumber, OrderRecord, ProductId, Result, Version};

/// Options for writing an inventory item.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Expected stored version for optimistic concurrency control.
    /// If None, the write overwrites unconditionally (use with caution).
    pub expected_version: Option<Version>,
}

impl PutOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the record to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the record to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Single-table key-value store holding inventory items and cached orders.
///
/// All implementations must be thread-safe (Send + Sync). Writes are per
/// record; there is no multi-record transaction.
#[async_trait]
pub trait InventoryTable: Send + Sync {
    /// Reads the inventory item for a product.
    ///
    /// Returns None if the product has no item.
    async fn get_item(&self, product_id: &ProductId) -> Result<Option<InventoryItemRecord>>;

    /// Writes an inventory item.
    ///
    /// If `options.expected_version` is set, the write fails with
    /// `ConcurrencyConflict` unless the stored version (0 when absent)
    /// matches. Returns the new stored version.
    async fn put_item(&self, record: InventoryItemRecord, options: PutOptions) -> Result<Version>;

    /// Reads a cached order, expired or not. TTL handling is up to the caller.
    async fn get_order(&self, order_number: &OrderNumber) -> Result<Option<OrderRecord>>;

    /// Upserts a cached order unconditionally.
    async fn put_order(&self, record: OrderRecord) -> Result<()>;
}
