//! Domain events published by the inventory service.

use common::{OrderNumber, ProductId};
use serde::{Deserialize, Serialize};

pub const STOCK_UPDATED_V1: &str = "inventory.stockUpdated.v1";
pub const STOCK_RESERVED_V1: &str = "inventory.stockReserved.v1";
pub const STOCK_RESERVATION_FAILED_V1: &str = "inventory.stockReservationFailed.v1";
pub const OUT_OF_STOCK_V1: &str = "inventory.outOfStock.v1";
pub const PRODUCT_ADDED_V1: &str = "inventory.productAdded.v1";

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Send + Sync {
    /// Returns the versioned event type, used as the envelope `type`.
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload, the envelope `data`.
    fn payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// Events the inventory service emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEvent {
    /// The physical stock level of a product changed.
    StockUpdated(StockUpdatedData),

    /// Every product of an order now holds a unit for it.
    StockReserved(OrderStockData),

    /// At least one product of an order could not be reserved.
    StockReservationFailed(OrderStockData),

    /// A dispatch left a product with no available stock.
    ProductOutOfStock(ProductData),

    /// A product exists upstream that has no inventory item yet.
    NewProductAdded(ProductData),
}

impl InventoryEvent {
    pub fn stock_updated(product_id: ProductId, previous: i64, new: i64) -> Self {
        InventoryEvent::StockUpdated(StockUpdatedData {
            product_id,
            previous_stock_level: previous,
            new_stock_level: new,
        })
    }

    pub fn stock_reserved(order_number: OrderNumber) -> Self {
        InventoryEvent::StockReserved(OrderStockData { order_number })
    }

    pub fn stock_reservation_failed(order_number: OrderNumber) -> Self {
        InventoryEvent::StockReservationFailed(OrderStockData { order_number })
    }

    pub fn out_of_stock(product_id: ProductId) -> Self {
        InventoryEvent::ProductOutOfStock(ProductData { product_id })
    }

    pub fn new_product_added(product_id: ProductId) -> Self {
        InventoryEvent::NewProductAdded(ProductData { product_id })
    }
}

impl DomainEvent for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockUpdated(_) => STOCK_UPDATED_V1,
            InventoryEvent::StockReserved(_) => STOCK_RESERVED_V1,
            InventoryEvent::StockReservationFailed(_) => STOCK_RESERVATION_FAILED_V1,
            InventoryEvent::ProductOutOfStock(_) => OUT_OF_STOCK_V1,
            InventoryEvent::NewProductAdded(_) => PRODUCT_ADDED_V1,
        }
    }

    fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            InventoryEvent::StockUpdated(data) => serde_json::to_value(data),
            InventoryEvent::StockReserved(data) | InventoryEvent::StockReservationFailed(data) => {
                serde_json::to_value(data)
            }
            InventoryEvent::ProductOutOfStock(data) | InventoryEvent::NewProductAdded(data) => {
                serde_json::to_value(data)
            }
        }
    }
}

/// Payload of `inventory.stockUpdated.v1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdatedData {
    pub product_id: ProductId,
    pub previous_stock_level: i64,
    pub new_stock_level: i64,
}

/// Payload of the order-scoped reservation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStockData {
    pub order_number: OrderNumber,
}

/// Payload of the product-scoped events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub product_id: ProductId,
}
