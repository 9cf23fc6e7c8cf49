use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{OrderNumber, ProductId};
use serde::{Deserialize, Serialize};

/// Version number of a stored record, used for optimistic concurrency control.
///
/// A record that has never been written is at version 0. Every successful
/// write increments the stored version by 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version (0) of a record that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) of a record after its first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Stored shape of an inventory item, keyed by product id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemRecord {
    #[serde(rename = "PK")]
    pub pk: String,

    #[serde(rename = "Type")]
    pub record_type: String,

    pub product_id: ProductId,

    pub stock_level: i64,

    pub reserved_stock_level: i64,

    pub stock_orders: BTreeSet<OrderNumber>,

    /// Assigned by the table on write; ignored on the way in.
    #[serde(default)]
    pub version: Version,
}

impl InventoryItemRecord {
    /// Type tag stored alongside every inventory item.
    pub const TYPE: &'static str = "InventoryItem";

    /// Creates a record for the given product.
    pub fn new(
        product_id: ProductId,
        stock_level: i64,
        reserved_stock_level: i64,
        stock_orders: BTreeSet<OrderNumber>,
    ) -> Self {
        Self {
            pk: Self::partition_key(&product_id),
            record_type: Self::TYPE.to_string(),
            product_id,
            stock_level,
            reserved_stock_level,
            stock_orders,
            version: Version::initial(),
        }
    }

    /// Returns the partition key of the item for `product_id`.
    pub fn partition_key(product_id: &ProductId) -> String {
        product_id.as_str().to_string()
    }
}

/// Stored association between an order and the products it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(rename = "PK")]
    pub pk: String,

    #[serde(rename = "Type")]
    pub record_type: String,

    #[serde(rename = "Products")]
    pub products: Vec<ProductId>,

    /// The record reads as absent once this instant has passed.
    pub expires_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Type tag stored alongside every cached order.
    pub const TYPE: &'static str = "Orders";

    /// Creates a record expiring at `expires_at`.
    pub fn new(
        order_number: &OrderNumber,
        products: Vec<ProductId>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pk: Self::partition_key(order_number),
            record_type: Self::TYPE.to_string(),
            products,
            expires_at,
        }
    }

    /// Prefix of every cached order key.
    pub const KEY_PREFIX: &'static str = "ORDER_";

    /// Returns the partition key of the cached order, `ORDER_<orderNumber>`.
    pub fn partition_key(order_number: &OrderNumber) -> String {
        format!("{}{order_number}", Self::KEY_PREFIX)
    }

    /// Returns true once the record has outlived its TTL.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
