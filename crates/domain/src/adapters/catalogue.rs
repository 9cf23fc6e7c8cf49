//! In-memory product catalogue.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::ProductId;

use crate::error::DomainError;
use crate::ports::ProductCatalogue;

#[derive(Debug, Default)]
struct CatalogueState {
    products: Vec<ProductId>,
    fail_on_fetch: bool,
}

/// Fixed list of product ids, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalogue {
    state: Arc<RwLock<CatalogueState>>,
}

impl InMemoryProductCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products<I, P>(products: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProductId>,
    {
        let catalogue = Self::new();
        for product in products {
            catalogue.add_product(product);
        }
        catalogue
    }

    pub fn add_product(&self, product_id: impl Into<ProductId>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .products
            .push(product_id.into());
    }

    /// Configures the catalogue to fail every fetch.
    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_fetch = fail;
    }
}

#[async_trait]
impl ProductCatalogue for InMemoryProductCatalogue {
    async fn product_ids(&self) -> Result<Vec<ProductId>, DomainError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_fetch {
            return Err(DomainError::Catalogue(
                "product catalogue unavailable".to_string(),
            ));
        }
        Ok(state.products.clone())
    }
}
