//! Inventory item service: stock queries, stock updates, multi-product
//! reservation and dispatch.

use std::collections::HashSet;
use std::time::Duration;

use common::{ConversationId, OrderNumber, ProductId};
use inventory_store::StoreError;

use crate::adapters::order_cache::DEFAULT_ORDER_TTL;
use crate::context::RequestContext;
use crate::error::DomainError;
use crate::events::InventoryEvent;
use crate::item::InventoryItem;
use crate::ports::{EventPublisher, InventoryItemRepository, OrderCache, ProductCatalogue};
use crate::response::UpdateStockRequest;

/// Default number of conditional write attempts before giving up.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// Tunables of [`InventoryItemService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySettings {
    /// Upper bound on conditional write attempts per operation.
    pub max_write_attempts: u32,
    /// Lifetime of an order cache entry.
    pub order_cache_ttl: Duration,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            order_cache_ttl: DEFAULT_ORDER_TTL,
        }
    }
}

/// Why an order could not be reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationFailure {
    /// The product has no available stock.
    InsufficientStock(ProductId),
    /// The product has no inventory item. Redelivery cannot fix this.
    ProductNotFound(ProductId),
}

impl ReservationFailure {
    pub fn product_id(&self) -> &ProductId {
        match self {
            ReservationFailure::InsufficientStock(id) | ReservationFailure::ProductNotFound(id) => {
                id
            }
        }
    }
}

/// Business outcome of a reservation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// Every product now holds a unit for the order.
    Reserved,
    /// Nothing is held for the order.
    Failed(ReservationFailure),
}

impl ReservationOutcome {
    pub fn is_reserved(&self) -> bool {
        matches!(self, ReservationOutcome::Reserved)
    }

    fn label(&self) -> &'static str {
        match self {
            ReservationOutcome::Reserved => "reserved",
            ReservationOutcome::Failed(ReservationFailure::InsufficientStock(_)) => {
                "insufficient_stock"
            }
            ReservationOutcome::Failed(ReservationFailure::ProductNotFound(_)) => {
                "product_not_found"
            }
        }
    }
}

/// Result of one pass over an order's products.
enum ReservationPass {
    Done(ReservationOutcome),
    Conflict(ProductId),
}

/// Orchestrates the inventory saga steps against injected collaborators.
///
/// Every item write is conditional on the version that was read. A lost
/// race is retried from a fresh read, up to `max_write_attempts` times.
pub struct InventoryItemService<R, C, P, K> {
    repository: R,
    order_cache: C,
    publisher: P,
    catalogue: K,
    settings: InventorySettings,
}

impl<R, C, P, K> InventoryItemService<R, C, P, K>
where
    R: InventoryItemRepository,
    C: OrderCache,
    P: EventPublisher,
    K: ProductCatalogue,
{
    pub fn new(
        repository: R,
        order_cache: C,
        publisher: P,
        catalogue: K,
        settings: InventorySettings,
    ) -> Self {
        Self {
            repository,
            order_cache,
            publisher,
            catalogue,
            settings,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn order_cache(&self) -> &C {
        &self.order_cache
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    /// Loads the inventory item of a product.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id()))]
    pub async fn with_product_id(
        &self,
        ctx: &RequestContext,
        product_id: &ProductId,
    ) -> Result<InventoryItem, DomainError> {
        self.repository
            .with_product_id(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(product_id.clone()))
    }

    /// Sets the physical stock level of a product and publishes
    /// `inventory.stockUpdated.v1`.
    ///
    /// A product without an inventory item gets one, with a previous level
    /// of zero.
    #[tracing::instrument(skip(self, ctx, request), fields(trace_id = %ctx.trace_id(), product_id = %request.product_id))]
    pub async fn update_stock(
        &self,
        ctx: &RequestContext,
        request: &UpdateStockRequest,
    ) -> Result<InventoryItem, DomainError> {
        let (product_id, new_level) = request.validated().inspect_err(|err| {
            tracing::info!(error = %err, "rejected stock update");
        })?;

        for attempt in 1..=self.max_attempts() {
            let mut item = match self.repository.with_product_id(&product_id).await? {
                Some(item) => item,
                None => {
                    tracing::info!("creating inventory item");
                    InventoryItem::new(product_id.clone(), 0)
                }
            };

            let previous_level = item.current_stock_level();
            item.set_current_stock_level(new_level);

            match self.repository.update(&item).await {
                Ok(version) => {
                    item.set_version(version);
                    tracing::info!(previous_level, new_level, "stock level updated");
                    self.publisher
                        .publish(
                            ctx,
                            InventoryEvent::stock_updated(
                                product_id.clone(),
                                previous_level,
                                new_level,
                            ),
                            ctx.conversation_id(),
                        )
                        .await;
                    return Ok(item);
                }
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    record_conflict("update_stock", &product_id, attempt);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted(product_id))
    }

    /// Reserves one unit of every listed product for the order, or none.
    ///
    /// Products are checked in input order and the first one that is missing
    /// or out of stock fails the whole request. A product that already holds
    /// a reservation for this order counts as sufficient, so redelivery of
    /// the same order is a no-op. On failure, reservations left behind by an
    /// earlier partial attempt are released.
    ///
    /// Publishes `inventory.stockReserved.v1` or
    /// `inventory.stockReservationFailed.v1`, tagged with `conversation_id`.
    /// Store errors are returned without publishing anything.
    #[tracing::instrument(
        skip(self, ctx, product_ids, conversation_id),
        fields(trace_id = %ctx.trace_id(), product_count = product_ids.len())
    )]
    pub async fn reserve_stock_for_order(
        &self,
        ctx: &RequestContext,
        order_number: &OrderNumber,
        product_ids: &[ProductId],
        conversation_id: Option<&ConversationId>,
    ) -> Result<ReservationOutcome, DomainError> {
        let products = distinct(product_ids);
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match self.reservation_pass(order_number, &products).await? {
                ReservationPass::Done(outcome) => {
                    self.publish_reservation_outcome(ctx, order_number, &outcome, conversation_id)
                        .await;
                    metrics::counter!("inventory_reservations_total", "outcome" => outcome.label())
                        .increment(1);
                    return Ok(outcome);
                }
                ReservationPass::Conflict(product_id) => {
                    record_conflict("reserve_stock_for_order", &product_id, attempt);
                    if attempt >= max_attempts {
                        metrics::counter!("inventory_reservations_total", "outcome" => "exhausted")
                            .increment(1);
                        return Err(self.exhausted(product_id));
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Converts the order's reservations into permanent stock reductions.
    ///
    /// The product list comes from the order cache. Products that are missing
    /// or no longer reserved for the order are skipped. Returns the products
    /// actually dispatched.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id()))]
    pub async fn order_dispatched(
        &self,
        ctx: &RequestContext,
        order_number: &OrderNumber,
    ) -> Result<Vec<ProductId>, DomainError> {
        let products = self.order_cache.products(order_number).await?;
        if products.is_empty() {
            return Err(DomainError::OrderNotFound(order_number.clone()));
        }

        let mut dispatched = Vec::new();
        for product_id in distinct(&products) {
            let Some((previous_level, item)) =
                self.dispatch_item(order_number, &product_id).await?
            else {
                continue;
            };

            metrics::counter!("inventory_dispatched_items_total").increment(1);
            self.publisher
                .publish(
                    ctx,
                    InventoryEvent::stock_updated(
                        product_id.clone(),
                        previous_level,
                        item.current_stock_level(),
                    ),
                    ctx.conversation_id(),
                )
                .await;

            if item.available_stock_level() <= 0 {
                tracing::warn!(product_id = %product_id, "product out of stock");
                self.publisher
                    .publish(
                        ctx,
                        InventoryEvent::out_of_stock(product_id.clone()),
                        ctx.conversation_id(),
                    )
                    .await;
            }

            dispatched.push(product_id);
        }

        tracing::info!(dispatched = dispatched.len(), "order dispatched");
        Ok(dispatched)
    }

    /// Announces every catalogue product that has no inventory item yet.
    ///
    /// Returns the products announced with `inventory.productAdded.v1`.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id()))]
    pub async fn refresh_product_cache(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ProductId>, DomainError> {
        let products = self.catalogue.product_ids().await?;
        if products.is_empty() {
            return Err(DomainError::Validation(vec![
                "No products found".to_string(),
            ]));
        }

        let mut added = Vec::new();
        for product_id in distinct(&products) {
            if self.repository.with_product_id(&product_id).await?.is_some() {
                continue;
            }
            self.publisher
                .publish(
                    ctx,
                    InventoryEvent::new_product_added(product_id.clone()),
                    ctx.conversation_id(),
                )
                .await;
            added.push(product_id);
        }

        tracing::info!(
            catalogue_size = products.len(),
            added = added.len(),
            "product cache refreshed"
        );
        Ok(added)
    }

    /// Publishes `inventory.productAdded.v1` for a newly created product.
    #[tracing::instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id()))]
    pub async fn product_created(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
    ) -> Result<(), DomainError> {
        self.publisher
            .publish(
                ctx,
                InventoryEvent::new_product_added(product_id),
                ctx.conversation_id(),
            )
            .await;
        Ok(())
    }

    /// Remembers the products of a reserved order for the later dispatch.
    #[tracing::instrument(skip(self, ctx, product_ids), fields(trace_id = %ctx.trace_id()))]
    pub async fn remember_order(
        &self,
        ctx: &RequestContext,
        order_number: &OrderNumber,
        product_ids: &[ProductId],
    ) -> Result<(), DomainError> {
        self.order_cache.store(order_number, product_ids).await?;
        Ok(())
    }

    async fn reservation_pass(
        &self,
        order_number: &OrderNumber,
        products: &[ProductId],
    ) -> Result<ReservationPass, DomainError> {
        let mut scanned = Vec::with_capacity(products.len());

        for product_id in products {
            let failure = match self.repository.with_product_id(product_id).await? {
                None => ReservationFailure::ProductNotFound(product_id.clone()),
                Some(item) if item.has_reservation_for(order_number) => {
                    scanned.push(item);
                    continue;
                }
                Some(item) if item.available_stock_level() <= 0 => {
                    ReservationFailure::InsufficientStock(product_id.clone())
                }
                Some(item) => {
                    scanned.push(item);
                    continue;
                }
            };

            tracing::info!(product_id = %product_id, ?failure, "reservation failed");
            if let Some(conflict) = self.release_partial(order_number, products).await? {
                return Ok(ReservationPass::Conflict(conflict));
            }
            return Ok(ReservationPass::Done(ReservationOutcome::Failed(failure)));
        }

        for mut item in scanned {
            if item.has_reservation_for(order_number) {
                tracing::debug!(product_id = %item.product_id(), "already reserved for order");
                continue;
            }
            item.reserve_stock_for(order_number);
            match self.repository.update(&item).await {
                Ok(_) => {}
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    return Ok(ReservationPass::Conflict(item.product_id().clone()));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(ReservationPass::Done(ReservationOutcome::Reserved))
    }

    /// Releases reservations for the order left by an earlier partial attempt.
    /// Returns the product whose write conflicted, if any.
    async fn release_partial(
        &self,
        order_number: &OrderNumber,
        products: &[ProductId],
    ) -> Result<Option<ProductId>, DomainError> {
        for product_id in products {
            let Some(mut item) = self.repository.with_product_id(product_id).await? else {
                continue;
            };
            if !item.has_reservation_for(order_number) {
                continue;
            }

            item.release_stock_for(order_number);
            match self.repository.update(&item).await {
                Ok(_) => tracing::info!(product_id = %product_id, "released partial reservation"),
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    return Ok(Some(product_id.clone()));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }

    /// Dispatches one product, retrying on conflict. Returns the previous
    /// stock level and the written item, or None when skipped.
    async fn dispatch_item(
        &self,
        order_number: &OrderNumber,
        product_id: &ProductId,
    ) -> Result<Option<(i64, InventoryItem)>, DomainError> {
        for attempt in 1..=self.max_attempts() {
            let Some(mut item) = self.repository.with_product_id(product_id).await? else {
                tracing::warn!(product_id = %product_id, "skipping dispatch of unknown product");
                return Ok(None);
            };
            if !item.has_reservation_for(order_number) {
                tracing::warn!(product_id = %product_id, "skipping dispatch, no reservation for order");
                return Ok(None);
            }

            let previous_level = item.current_stock_level();
            item.stock_dispatched_for(order_number);

            match self.repository.update(&item).await {
                Ok(version) => {
                    item.set_version(version);
                    return Ok(Some((previous_level, item)));
                }
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    record_conflict("order_dispatched", product_id, attempt);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(self.exhausted(product_id.clone()))
    }

    async fn publish_reservation_outcome(
        &self,
        ctx: &RequestContext,
        order_number: &OrderNumber,
        outcome: &ReservationOutcome,
        conversation_id: Option<&ConversationId>,
    ) {
        let event = match outcome {
            ReservationOutcome::Reserved => {
                tracing::info!("stock reserved for order");
                InventoryEvent::stock_reserved(order_number.clone())
            }
            ReservationOutcome::Failed(_) => {
                InventoryEvent::stock_reservation_failed(order_number.clone())
            }
        };
        self.publisher.publish(ctx, event, conversation_id).await;
    }

    fn max_attempts(&self) -> u32 {
        self.settings.max_write_attempts.max(1)
    }

    fn exhausted(&self, product_id: ProductId) -> DomainError {
        DomainError::ConcurrencyExhausted {
            product_id,
            attempts: self.max_attempts(),
        }
    }
}

fn record_conflict(operation: &'static str, product_id: &ProductId, attempt: u32) {
    metrics::counter!("inventory_write_conflicts_total", "operation" => operation).increment(1);
    tracing::warn!(operation, product_id = %product_id, attempt, "write conflict, retrying");
}

/// Drops repeated product ids, keeping the first occurrence.
fn distinct(product_ids: &[ProductId]) -> Vec<ProductId> {
    let mut seen = HashSet::with_capacity(product_ids.len());
    product_ids
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use inventory_store::InMemoryInventoryTable;

    use super::*;
    use crate::adapters::{
        InMemoryEventPublisher, InMemoryProductCatalogue, TableInventoryItemRepository,
        TableOrderCache,
    };
    use crate::events::{
        OUT_OF_STOCK_V1, PRODUCT_ADDED_V1, STOCK_RESERVATION_FAILED_V1, STOCK_RESERVED_V1,
        STOCK_UPDATED_V1,
    };

    type TestService = InventoryItemService<
        TableInventoryItemRepository<InMemoryInventoryTable>,
        TableOrderCache<InMemoryInventoryTable>,
        InMemoryEventPublisher,
        InMemoryProductCatalogue,
    >;

    fn create_service() -> (TestService, InMemoryInventoryTable) {
        let table = InMemoryInventoryTable::new();
        let service = InventoryItemService::new(
            TableInventoryItemRepository::new(table.clone()),
            TableOrderCache::new(table.clone(), DEFAULT_ORDER_TTL),
            InMemoryEventPublisher::new("test", "test-bus"),
            InMemoryProductCatalogue::with_products(["SKU-1", "SKU-2", "SKU-3"]),
            InventorySettings::default(),
        );
        (service, table)
    }

    async fn seed(service: &TestService, product_id: &str, level: i64) {
        service
            .update_stock(
                &RequestContext::new(),
                &UpdateStockRequest::new(product_id, Some(level)),
            )
            .await
            .unwrap();
        service.publisher().clear();
    }

    fn pids(ids: &[&str]) -> Vec<ProductId> {
        ids.iter().map(|id| ProductId::new(*id)).collect()
    }

    #[test]
    fn distinct_keeps_first_occurrence() {
        let ids = distinct(&pids(&["SKU-2", "SKU-1", "SKU-2", "SKU-3", "SKU-1"]));
        assert_eq!(ids, pids(&["SKU-2", "SKU-1", "SKU-3"]));
    }

    #[tokio::test]
    async fn update_stock_creates_missing_item() {
        let (service, _) = create_service();
        let ctx = RequestContext::new();

        let item = service
            .update_stock(&ctx, &UpdateStockRequest::new("SKU-1", Some(7)))
            .await
            .unwrap();

        assert_eq!(item.current_stock_level(), 7);
        let events = service.publisher().published();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, STOCK_UPDATED_V1);
        assert_eq!(events[0].data["previousStockLevel"], 0);
        assert_eq!(events[0].data["newStockLevel"], 7);
    }

    #[tokio::test]
    async fn update_stock_reports_previous_level() {
        let (service, _) = create_service();
        seed(&service, "SKU-1", 4).await;

        service
            .update_stock(
                &RequestContext::new(),
                &UpdateStockRequest::new("SKU-1", Some(9)),
            )
            .await
            .unwrap();

        let events = service.publisher().published();
        assert_eq!(events[0].data["previousStockLevel"], 4);
        assert_eq!(events[0].data["newStockLevel"], 9);
    }

    #[tokio::test]
    async fn with_product_id_not_found() {
        let (service, _) = create_service();
        let result = service
            .with_product_id(&RequestContext::new(), &ProductId::new("nope"))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn reservation_is_idempotent_on_redelivery() {
        let (service, table) = create_service();
        seed(&service, "SKU-1", 5).await;
        let ctx = RequestContext::new();
        let order = OrderNumber::new("O1");

        for _ in 0..2 {
            let outcome = service
                .reserve_stock_for_order(&ctx, &order, &pids(&["SKU-1"]), None)
                .await
                .unwrap();
            assert!(outcome.is_reserved());
        }

        let item = service
            .with_product_id(&ctx, &ProductId::new("SKU-1"))
            .await
            .unwrap();
        assert_eq!(item.reserved_stock_level(), 1);
        // seed + first reservation; the redelivery writes nothing
        assert_eq!(table.item_write_count(), 2);
        assert_eq!(
            service.publisher().published_types(),
            vec![STOCK_RESERVED_V1, STOCK_RESERVED_V1]
        );
    }

    #[tokio::test]
    async fn duplicate_products_reserve_once() {
        let (service, _) = create_service();
        seed(&service, "SKU-1", 5).await;
        let ctx = RequestContext::new();

        service
            .reserve_stock_for_order(&ctx, &"O1".into(), &pids(&["SKU-1", "SKU-1"]), None)
            .await
            .unwrap();

        let item = service
            .with_product_id(&ctx, &ProductId::new("SKU-1"))
            .await
            .unwrap();
        assert_eq!(item.reserved_stock_level(), 1);
    }

    #[tokio::test]
    async fn missing_product_fails_reservation() {
        let (service, _) = create_service();
        seed(&service, "SKU-1", 5).await;

        let outcome = service
            .reserve_stock_for_order(
                &RequestContext::new(),
                &"O1".into(),
                &pids(&["SKU-1", "ghost"]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReservationOutcome::Failed(ReservationFailure::ProductNotFound(ProductId::new(
                "ghost"
            )))
        );
        assert_eq!(
            service.publisher().published_types(),
            vec![STOCK_RESERVATION_FAILED_V1]
        );
    }

    #[tokio::test]
    async fn dispatch_publishes_out_of_stock() {
        let (service, _) = create_service();
        seed(&service, "SKU-1", 1).await;
        let ctx = RequestContext::new();
        let order = OrderNumber::new("O1");

        service
            .reserve_stock_for_order(&ctx, &order, &pids(&["SKU-1"]), None)
            .await
            .unwrap();
        service
            .remember_order(&ctx, &order, &pids(&["SKU-1"]))
            .await
            .unwrap();
        service.publisher().clear();

        let dispatched = service.order_dispatched(&ctx, &order).await.unwrap();

        assert_eq!(dispatched, pids(&["SKU-1"]));
        assert_eq!(
            service.publisher().published_types(),
            vec![STOCK_UPDATED_V1, OUT_OF_STOCK_V1]
        );
    }

    #[tokio::test]
    async fn dispatch_of_unknown_order_is_retryable() {
        let (service, _) = create_service();
        let err = service
            .order_dispatched(&RequestContext::new(), &"unknown".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn refresh_announces_unknown_products() {
        let (service, _) = create_service();
        seed(&service, "SKU-2", 3).await;

        let added = service
            .refresh_product_cache(&RequestContext::new())
            .await
            .unwrap();

        assert_eq!(added, pids(&["SKU-1", "SKU-3"]));
        assert_eq!(
            service.publisher().published_types(),
            vec![PRODUCT_ADDED_V1, PRODUCT_ADDED_V1]
        );
    }

    #[tokio::test]
    async fn refresh_with_empty_catalogue_fails_validation() {
        let table = InMemoryInventoryTable::new();
        let service = InventoryItemService::new(
            TableInventoryItemRepository::new(table.clone()),
            TableOrderCache::new(table, DEFAULT_ORDER_TTL),
            InMemoryEventPublisher::new("test", "test-bus"),
            InMemoryProductCatalogue::new(),
            InventorySettings::default(),
        );

        let err = service
            .refresh_product_cache(&RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(r) if r == vec!["No products found"]));
    }

    #[tokio::test]
    async fn product_created_announces_product() {
        let (service, _) = create_service();
        service
            .product_created(&RequestContext::new(), ProductId::new("SKU-9"))
            .await
            .unwrap();

        let events = service.publisher().published();
        assert_eq!(events[0].event_type, PRODUCT_ADDED_V1);
        assert_eq!(events[0].data["productId"], "SKU-9");
    }
}
