//! Maps decoded external events onto inventory operations.

use std::sync::Arc;

use common::CloudEvent;
use domain::{
    DomainError, EventPublisher, InventoryItemRepository, InventoryItemService, OrderCache,
    ProductCatalogue, ReservationOutcome, RequestContext,
};

use crate::error::Result;
use crate::events::{OrderCompletedEventV1, OrderCreatedEventV1, ProductCreatedEventV1};

/// Translates each external event into exactly one domain call.
pub struct ExternalEventHandler<R, C, P, K> {
    service: Arc<InventoryItemService<R, C, P, K>>,
}

impl<R, C, P, K> Clone for ExternalEventHandler<R, C, P, K> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<R, C, P, K> ExternalEventHandler<R, C, P, K>
where
    R: InventoryItemRepository,
    C: OrderCache,
    P: EventPublisher,
    K: ProductCatalogue,
{
    pub fn new(service: Arc<InventoryItemService<R, C, P, K>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &InventoryItemService<R, C, P, K> {
        &self.service
    }

    /// `product.productCreated.v1`: announce the new product.
    #[tracing::instrument(skip_all, fields(product_id = %event.data.product_id))]
    pub async fn handle_product_created_v1(
        &self,
        ctx: &RequestContext,
        event: CloudEvent<ProductCreatedEventV1>,
    ) -> Result<()> {
        self.service
            .product_created(ctx, event.data.product_id)
            .await?;
        Ok(())
    }

    /// `orders.orderCreated.v1`: reserve stock, and remember the order's
    /// products once it is reserved.
    ///
    /// A failed reservation is a handled outcome; the failure event has
    /// already been published.
    #[tracing::instrument(skip_all, fields(order_number = %event.data.order_number))]
    pub async fn handle_order_created_v1(
        &self,
        ctx: &RequestContext,
        event: CloudEvent<OrderCreatedEventV1>,
    ) -> Result<()> {
        let OrderCreatedEventV1 {
            order_number,
            products,
        } = event.data;

        if products.is_empty() {
            return Err(DomainError::Validation(vec![
                "Order has no products".to_string(),
            ])
            .into());
        }

        let outcome = self
            .service
            .reserve_stock_for_order(ctx, &order_number, &products, ctx.conversation_id())
            .await?;

        match outcome {
            ReservationOutcome::Reserved => {
                self.service
                    .remember_order(ctx, &order_number, &products)
                    .await?;
            }
            ReservationOutcome::Failed(failure) => {
                tracing::info!(
                    product_id = %failure.product_id(),
                    ?failure,
                    "order not reserved"
                );
            }
        }
        Ok(())
    }

    /// `orders.orderCompleted.v1`: dispatch the order's reserved stock.
    #[tracing::instrument(skip_all, fields(order_number = %event.data.order_number))]
    pub async fn handle_order_completed_v1(
        &self,
        ctx: &RequestContext,
        event: CloudEvent<OrderCompletedEventV1>,
    ) -> Result<()> {
        let dispatched = self
            .service
            .order_dispatched(ctx, &event.data.order_number)
            .await?;
        tracing::debug!(dispatched = dispatched.len(), "order completion handled");
        Ok(())
    }
}
