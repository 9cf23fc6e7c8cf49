//! Versioned schemas of the external events the ACL consumes.
//!
//! These mirror what upstream services publish. They are never used inside
//! the domain; handlers translate them into domain calls.

use common::{OrderNumber, ProductId};
use serde::{Deserialize, Serialize};

pub const PRODUCT_CREATED_V1: &str = "product.productCreated.v1";
pub const ORDER_CREATED_V1: &str = "orders.orderCreated.v1";
pub const ORDER_COMPLETED_V1: &str = "orders.orderCompleted.v1";

/// A product was added to the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreatedEventV1 {
    pub product_id: ProductId,
}

/// An order was placed. One reservation unit is requested per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedEventV1 {
    pub order_number: OrderNumber,
    pub products: Vec<ProductId>,
}

/// An order was completed. Carries no product list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCompletedEventV1 {
    pub order_number: OrderNumber,
}
