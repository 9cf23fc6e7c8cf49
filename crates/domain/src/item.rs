//! Inventory item aggregate.

use std::collections::BTreeSet;

use common::{OrderNumber, ProductId};
use inventory_store::{InventoryItemRecord, Version};

/// Stock and reservation state of a single product.
///
/// Every reservation is one unit held by one order. The reservation methods
/// are idempotent per order id, which is what makes redelivered order events
/// safe to process twice.
///
/// Invariant: `reserved_stock_level == reserved_stock_orders.len()` for any
/// item built through this type. Items loaded from storage keep whatever
/// levels were stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    product_id: ProductId,
    current_stock_level: i64,
    reserved_stock_level: i64,
    reserved_stock_orders: BTreeSet<OrderNumber>,
    /// Stored version this state was read at; `initial` if never persisted.
    version: Version,
}

impl InventoryItem {
    /// Creates a new, never persisted item with no reservations.
    pub fn new(product_id: ProductId, current_stock_level: i64) -> Self {
        Self {
            product_id,
            current_stock_level,
            reserved_stock_level: 0,
            reserved_stock_orders: BTreeSet::new(),
            version: Version::initial(),
        }
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn current_stock_level(&self) -> i64 {
        self.current_stock_level
    }

    pub fn reserved_stock_level(&self) -> i64 {
        self.reserved_stock_level
    }

    pub fn reserved_stock_orders(&self) -> &BTreeSet<OrderNumber> {
        &self.reserved_stock_orders
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Records the version assigned by the latest successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Overwrites the physical stock level. Reservations are left as is.
    pub fn set_current_stock_level(&mut self, level: i64) {
        self.current_stock_level = level;
    }

    /// Stock that is neither shipped nor held by an order. May be negative.
    pub fn available_stock_level(&self) -> i64 {
        self.current_stock_level - self.reserved_stock_level
    }

    /// Returns true if `order_number` currently holds a unit of this item.
    pub fn has_reservation_for(&self, order_number: &OrderNumber) -> bool {
        self.reserved_stock_orders.contains(order_number)
    }

    /// Holds one unit for the order. No-op if the order already holds one.
    pub fn reserve_stock_for(&mut self, order_number: &OrderNumber) {
        if self.reserved_stock_orders.insert(order_number.clone()) {
            self.reserved_stock_level += 1;
        }
    }

    /// Drops the order's hold. No-op if the order holds nothing.
    pub fn release_stock_for(&mut self, order_number: &OrderNumber) {
        if self.reserved_stock_orders.remove(order_number) {
            self.reserved_stock_level -= 1;
        }
    }

    /// Turns the order's hold into a permanent stock reduction.
    /// No-op if the order holds nothing.
    pub fn stock_dispatched_for(&mut self, order_number: &OrderNumber) {
        if self.reserved_stock_orders.remove(order_number) {
            self.reserved_stock_level -= 1;
            self.current_stock_level -= 1;
        }
    }
}

impl From<InventoryItemRecord> for InventoryItem {
    fn from(record: InventoryItemRecord) -> Self {
        Self {
            product_id: record.product_id,
            current_stock_level: record.stock_level,
            reserved_stock_level: record.reserved_stock_level,
            reserved_stock_orders: record.stock_orders,
            version: record.version,
        }
    }
}

impl From<&InventoryItem> for InventoryItemRecord {
    fn from(item: &InventoryItem) -> Self {
        let mut record = InventoryItemRecord::new(
            item.product_id.clone(),
            item.current_stock_level,
            item.reserved_stock_level,
            item.reserved_stock_orders.clone(),
        );
        record.version = item.version;
        record
    }
}
