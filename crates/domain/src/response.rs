//! Request and response shapes of the synchronous query surface.

use common::ProductId;
use inventory_store::OrderRecord;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::item::InventoryItem;

/// Minimum length of a product id accepted by stock updates.
pub const MIN_PRODUCT_ID_LEN: usize = 3;

/// Response envelope returned to synchronous callers.
///
/// Expected business failures are reported through `success = false` and
/// human-readable `message` entries instead of errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResponse<T> {
    pub data: Option<T>,
    pub message: Vec<String>,
    pub success: bool,
}

impl<T> HandlerResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            message: vec!["OK".to_string()],
            success: true,
        }
    }

    pub fn failure(message: Vec<String>) -> Self {
        Self {
            data: None,
            message,
            success: false,
        }
    }
}

impl<T> From<Result<T, DomainError>> for HandlerResponse<T> {
    fn from(result: Result<T, DomainError>) -> Self {
        match result {
            Ok(data) => HandlerResponse::ok(data),
            Err(DomainError::Validation(reasons)) => HandlerResponse::failure(reasons),
            Err(DomainError::NotFound(_)) => {
                HandlerResponse::failure(vec!["Product not found".to_string()])
            }
            Err(err) => HandlerResponse::failure(vec![format!("Unknown error: {err}")]),
        }
    }
}

/// Read view of an inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDto {
    pub product_id: ProductId,
    pub current_stock_level: i64,
    pub reserved_stock_level: i64,
    pub available_stock_level: i64,
}

impl From<&InventoryItem> for InventoryItemDto {
    fn from(item: &InventoryItem) -> Self {
        Self {
            product_id: item.product_id().clone(),
            current_stock_level: item.current_stock_level(),
            reserved_stock_level: item.reserved_stock_level(),
            available_stock_level: item.available_stock_level(),
        }
    }
}

/// Request to set the physical stock level of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub stock_level: Option<i64>,
}

impl UpdateStockRequest {
    pub fn new(product_id: impl Into<String>, stock_level: Option<i64>) -> Self {
        Self {
            product_id: product_id.into(),
            stock_level,
        }
    }

    /// Returns one message per broken rule; empty when the request is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut reasons = Vec::new();

        let product_id = self.product_id.trim();
        if product_id.chars().count() < MIN_PRODUCT_ID_LEN {
            reasons.push(format!(
                "ProductId must be at least {MIN_PRODUCT_ID_LEN} characters"
            ));
        }
        // cached orders live under this prefix in the same table
        if product_id.starts_with(OrderRecord::KEY_PREFIX) {
            reasons.push(format!(
                "ProductId must not start with {}",
                OrderRecord::KEY_PREFIX
            ));
        }

        match self.stock_level {
            None => reasons.push("StockLevel must be provided".to_string()),
            Some(level) if level <= 0 => {
                reasons.push("StockLevel must be greater than zero".to_string())
            }
            Some(_) => {}
        }

        reasons
    }

    /// Validates the request and returns its typed parts.
    pub fn validated(&self) -> Result<(ProductId, i64), DomainError> {
        let reasons = self.validate();
        match self.stock_level {
            Some(level) if reasons.is_empty() => {
                Ok((ProductId::new(self.product_id.trim()), level))
            }
            _ => Err(DomainError::Validation(reasons)),
        }
    }
}
