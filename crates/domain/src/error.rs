//! Domain error types.

use common::{OrderNumber, ProductId};
use inventory_store::StoreError;
use thiserror::Error;

/// Errors that can occur during inventory operations.
///
/// Expected business outcomes (an order that cannot be reserved) are not
/// errors; see [`crate::ReservationOutcome`].
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request is malformed. Carries one message per broken rule.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// No inventory item exists for the product.
    #[error("Inventory item not found: {0}")]
    NotFound(ProductId),

    /// No product list is cached for the order.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderNumber),

    /// The backing store failed.
    #[error("Data access error: {0}")]
    DataAccess(#[from] StoreError),

    /// Every conditional write attempt lost against a concurrent writer.
    #[error("Gave up writing {product_id} after {attempts} conflicting attempts")]
    ConcurrencyExhausted { product_id: ProductId, attempts: u32 },

    /// The product catalogue could not be fetched.
    #[error("Product catalogue error: {0}")]
    Catalogue(String),
}

impl DomainError {
    /// Returns true if redelivering the triggering message may succeed.
    ///
    /// An unknown order is retryable: the order-created message that fills
    /// the cache may not have been processed yet.
    pub fn is_retryable(&self) -> bool {
        match self {
            DomainError::Validation(_) | DomainError::NotFound(_) => false,
            DomainError::OrderNotFound(_)
            | DomainError::DataAccess(_)
            | DomainError::ConcurrencyExhausted { .. }
            | DomainError::Catalogue(_) => true,
        }
    }
}
