//! Integration tests for the inventory item service.
//!
//! These tests drive the service through its table-backed adapters and
//! verify stock arithmetic, all-or-nothing reservation, dispatch, and
//! behaviour under conflicting writes and store outages.

use std::collections::BTreeSet;

use domain::events::{
    OUT_OF_STOCK_V1, STOCK_RESERVATION_FAILED_V1, STOCK_RESERVED_V1, STOCK_UPDATED_V1,
};
use domain::{
    ConversationId, DomainError, InMemoryEventPublisher, InMemoryProductCatalogue,
    InventoryItemService, InventorySettings, OrderCache, OrderNumber, ProductId,
    ReservationFailure, ReservationOutcome, RequestContext, TableInventoryItemRepository,
    TableOrderCache, UpdateStockRequest,
};
use inventory_store::{InMemoryInventoryTable, InventoryItemRecord, InventoryTable, PutOptions};

type TestService = InventoryItemService<
    TableInventoryItemRepository<InMemoryInventoryTable>,
    TableOrderCache<InMemoryInventoryTable>,
    InMemoryEventPublisher,
    InMemoryProductCatalogue,
>;

struct TestHarness {
    service: TestService,
    table: InMemoryInventoryTable,
    ctx: RequestContext,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_settings(InventorySettings::default())
    }

    fn with_settings(settings: InventorySettings) -> Self {
        let table = InMemoryInventoryTable::new();
        let service = InventoryItemService::new(
            TableInventoryItemRepository::new(table.clone()),
            TableOrderCache::new(table.clone(), settings.order_cache_ttl),
            InMemoryEventPublisher::new("test", "test-bus"),
            InMemoryProductCatalogue::new(),
            settings,
        );
        Self {
            service,
            table,
            ctx: RequestContext::new(),
        }
    }

    /// Writes an item straight into the table.
    async fn seed(&self, product_id: &str, current: i64, orders: &[&str]) {
        let orders: BTreeSet<OrderNumber> = orders.iter().map(|o| OrderNumber::new(*o)).collect();
        let record = InventoryItemRecord::new(
            ProductId::new(product_id),
            current,
            orders.len() as i64,
            orders,
        );
        self.table.put_item(record, PutOptions::new()).await.unwrap();
    }

    async fn item(&self, product_id: &str) -> domain::InventoryItem {
        self.service
            .with_product_id(&self.ctx, &ProductId::new(product_id))
            .await
            .unwrap()
    }

    fn published_types(&self) -> Vec<String> {
        self.service.publisher().published_types()
    }

    async fn reserve(&self, order: &str, products: &[&str]) -> ReservationOutcome {
        self.service
            .reserve_stock_for_order(&self.ctx, &OrderNumber::new(order), &pids(products), None)
            .await
            .unwrap()
    }
}

fn pids(ids: &[&str]) -> Vec<ProductId> {
    ids.iter().map(|id| ProductId::new(*id)).collect()
}

fn assert_arithmetic(item: &domain::InventoryItem) {
    assert_eq!(
        item.available_stock_level(),
        item.current_stock_level() - item.reserved_stock_level()
    );
    assert_eq!(
        item.reserved_stock_level(),
        item.reserved_stock_orders().len() as i64
    );
}

mod reservation {
    use super::*;

    #[tokio::test]
    async fn all_or_nothing_when_one_product_is_exhausted() {
        let harness = TestHarness::new();
        harness.seed("P1", 2, &[]).await;
        harness.seed("P2", 0, &[]).await;

        let outcome = harness.reserve("O1", &["P1", "P2"]).await;

        assert_eq!(
            outcome,
            ReservationOutcome::Failed(ReservationFailure::InsufficientStock(ProductId::new(
                "P2"
            )))
        );
        assert_eq!(harness.item("P1").await.reserved_stock_level(), 0);
        assert_eq!(harness.published_types(), vec![STOCK_RESERVATION_FAILED_V1]);
    }

    #[tokio::test]
    async fn reserves_every_product() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        harness.seed("P2", 3, &[]).await;

        let outcome = harness.reserve("O2", &["P1", "P2"]).await;

        assert_eq!(outcome, ReservationOutcome::Reserved);
        for product in ["P1", "P2"] {
            let item = harness.item(product).await;
            assert_eq!(item.reserved_stock_level(), 1);
            assert!(item.has_reservation_for(&OrderNumber::new("O2")));
            assert_arithmetic(&item);
        }
        assert_eq!(harness.published_types(), vec![STOCK_RESERVED_V1]);

        let event = &harness.service.publisher().published()[0];
        assert_eq!(event.data["orderNumber"], "O2");
    }

    #[tokio::test]
    async fn fail_fast_stops_at_first_insufficient_product() {
        let harness = TestHarness::new();
        harness.seed("P1", 0, &[]).await;
        harness.seed("P2", 5, &[]).await;

        let outcome = harness.reserve("O1", &["P1", "P2", "P3"]).await;

        assert_eq!(
            outcome,
            ReservationOutcome::Failed(ReservationFailure::InsufficientStock(ProductId::new(
                "P1"
            )))
        );
    }

    #[tokio::test]
    async fn tags_events_with_conversation_id() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        let conversation = ConversationId::new("conv-42");

        harness
            .service
            .reserve_stock_for_order(
                &harness.ctx,
                &OrderNumber::new("O1"),
                &pids(&["P1"]),
                Some(&conversation),
            )
            .await
            .unwrap();

        let event = &harness.service.publisher().published()[0];
        assert_eq!(event.conversation_id.as_ref(), Some(&conversation));
        assert_eq!(
            event.traceparent.as_deref(),
            Some(harness.ctx.traceparent().as_str())
        );
    }

    #[tokio::test]
    async fn unknown_product_is_a_non_retryable_failure() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;

        let outcome = harness.reserve("O1", &["ghost", "P1"]).await;

        assert_eq!(
            outcome,
            ReservationOutcome::Failed(ReservationFailure::ProductNotFound(ProductId::new(
                "ghost"
            )))
        );
        assert_eq!(harness.published_types(), vec![STOCK_RESERVATION_FAILED_V1]);
        assert_eq!(harness.item("P1").await.reserved_stock_level(), 0);
    }

    #[tokio::test]
    async fn last_unit_goes_to_one_order_only() {
        let harness = TestHarness::new();
        harness.seed("P1", 1, &[]).await;

        assert!(harness.reserve("O1", &["P1"]).await.is_reserved());
        assert!(!harness.reserve("O2", &["P1"]).await.is_reserved());

        let item = harness.item("P1").await;
        assert_eq!(item.available_stock_level(), 0);
        assert_arithmetic(&item);
    }

    #[tokio::test]
    async fn redelivery_counts_existing_hold_as_sufficient() {
        let harness = TestHarness::new();
        // the only unit is already held by this very order
        harness.seed("P1", 1, &["O1"]).await;

        let outcome = harness.reserve("O1", &["P1"]).await;

        assert_eq!(outcome, ReservationOutcome::Reserved);
        assert_eq!(harness.item("P1").await.reserved_stock_level(), 1);
    }

    #[tokio::test]
    async fn failure_releases_partial_reservation_from_earlier_attempt() {
        let harness = TestHarness::new();
        // an earlier attempt reserved P1 before failing on the store
        harness.seed("P1", 5, &["O1"]).await;
        harness.seed("P2", 0, &[]).await;

        let outcome = harness.reserve("O1", &["P1", "P2"]).await;

        assert!(!outcome.is_reserved());
        let item = harness.item("P1").await;
        assert_eq!(item.reserved_stock_level(), 0);
        assert!(!item.has_reservation_for(&OrderNumber::new("O1")));
    }

    #[tokio::test]
    async fn publish_failure_keeps_reservation() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        harness.service.publisher().set_fail_on_publish(true);

        let outcome = harness.reserve("O1", &["P1"]).await;

        assert!(outcome.is_reserved());
        assert_eq!(harness.item("P1").await.reserved_stock_level(), 1);
        assert!(harness.published_types().is_empty());
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn conflicting_write_restarts_the_scan() {
        let harness = TestHarness::new();
        harness.seed("P1", 1, &[]).await;

        // another worker takes the last unit between our read and write
        harness
            .table
            .interleave_write(&ProductId::new("P1"), |record| {
                record.stock_orders.insert(OrderNumber::new("OTHER"));
                record.reserved_stock_level += 1;
            })
            .await;

        let outcome = harness.reserve("O1", &["P1"]).await;

        assert_eq!(
            outcome,
            ReservationOutcome::Failed(ReservationFailure::InsufficientStock(ProductId::new(
                "P1"
            )))
        );
        let item = harness.item("P1").await;
        assert_eq!(item.reserved_stock_level(), 1);
        assert!(item.has_reservation_for(&OrderNumber::new("OTHER")));
        assert!(!item.has_reservation_for(&OrderNumber::new("O1")));
    }

    #[tokio::test]
    async fn conflict_with_room_to_spare_still_reserves() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        harness
            .table
            .interleave_write(&ProductId::new("P1"), |record| {
                record.stock_orders.insert(OrderNumber::new("OTHER"));
                record.reserved_stock_level += 1;
            })
            .await;

        assert!(harness.reserve("O1", &["P1"]).await.is_reserved());

        let item = harness.item("P1").await;
        assert_eq!(item.reserved_stock_level(), 2);
        assert_arithmetic(&item);
    }

    #[tokio::test]
    async fn exhausting_attempts_is_retryable() {
        let harness = TestHarness::with_settings(InventorySettings {
            max_write_attempts: 2,
            ..InventorySettings::default()
        });
        harness.seed("P1", 5, &[]).await;
        for _ in 0..2 {
            harness
                .table
                .interleave_write(&ProductId::new("P1"), |record| record.stock_level += 1)
                .await;
        }

        let err = harness
            .service
            .reserve_stock_for_order(&harness.ctx, &"O1".into(), &pids(&["P1"]), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::ConcurrencyExhausted { attempts: 2, .. }
        ));
        assert!(err.is_retryable());
        assert!(harness.published_types().is_empty());
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell() {
        let harness = TestHarness::new();
        harness.seed("P1", 3, &[]).await;
        let service = std::sync::Arc::new(harness.service);

        let mut handles = Vec::new();
        for n in 0..6 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .reserve_stock_for_order(
                        &RequestContext::new(),
                        &OrderNumber::new(format!("O{n}")),
                        &pids(&["P1"]),
                        None,
                    )
                    .await
            }));
        }

        for handle in handles {
            // losers either fail the reservation or run out of attempts
            let _ = handle.await.unwrap();
        }

        let item = service
            .with_product_id(&RequestContext::new(), &ProductId::new("P1"))
            .await
            .unwrap();
        assert!(item.reserved_stock_level() <= 3);
        assert_arithmetic(&item);
    }
}

mod dispatch {
    use super::*;

    #[tokio::test]
    async fn consumes_the_reservation() {
        let harness = TestHarness::new();
        harness.seed("P1", 10, &["O2"]).await;
        harness
            .service
            .remember_order(&harness.ctx, &"O2".into(), &pids(&["P1"]))
            .await
            .unwrap();

        let dispatched = harness
            .service
            .order_dispatched(&harness.ctx, &"O2".into())
            .await
            .unwrap();

        assert_eq!(dispatched, pids(&["P1"]));
        let item = harness.item("P1").await;
        assert_eq!(item.current_stock_level(), 9);
        assert_eq!(item.reserved_stock_level(), 0);
        assert!(item.reserved_stock_orders().is_empty());
        assert_arithmetic(&item);

        let event = &harness.service.publisher().published()[0];
        assert_eq!(event.event_type, STOCK_UPDATED_V1);
        assert_eq!(event.data["previousStockLevel"], 10);
        assert_eq!(event.data["newStockLevel"], 9);
    }

    #[tokio::test]
    async fn skips_products_not_reserved_for_the_order() {
        let harness = TestHarness::new();
        harness.seed("P1", 4, &["O1"]).await;
        harness.seed("P2", 4, &[]).await;
        harness
            .service
            .remember_order(&harness.ctx, &"O1".into(), &pids(&["P1", "P2", "ghost"]))
            .await
            .unwrap();

        let dispatched = harness
            .service
            .order_dispatched(&harness.ctx, &"O1".into())
            .await
            .unwrap();

        assert_eq!(dispatched, pids(&["P1"]));
        assert_eq!(harness.item("P2").await.current_stock_level(), 4);
    }

    #[tokio::test]
    async fn redelivered_completion_is_a_no_op() {
        let harness = TestHarness::new();
        harness.seed("P1", 4, &["O1"]).await;
        harness
            .service
            .remember_order(&harness.ctx, &"O1".into(), &pids(&["P1"]))
            .await
            .unwrap();

        for _ in 0..2 {
            harness
                .service
                .order_dispatched(&harness.ctx, &"O1".into())
                .await
                .unwrap();
        }

        assert_eq!(harness.item("P1").await.current_stock_level(), 3);
    }

    #[tokio::test]
    async fn last_unit_publishes_out_of_stock() {
        let harness = TestHarness::new();
        harness.seed("P1", 1, &["O1"]).await;
        harness
            .service
            .remember_order(&harness.ctx, &"O1".into(), &pids(&["P1"]))
            .await
            .unwrap();

        harness
            .service
            .order_dispatched(&harness.ctx, &"O1".into())
            .await
            .unwrap();

        assert_eq!(
            harness.published_types(),
            vec![STOCK_UPDATED_V1, OUT_OF_STOCK_V1]
        );
    }

    #[tokio::test]
    async fn uncached_order_is_order_not_found() {
        let harness = TestHarness::new();
        let err = harness
            .service
            .order_dispatched(&harness.ctx, &"O9".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(o) if o.as_str() == "O9"));
    }
}

mod order_cache {
    use super::*;

    #[tokio::test]
    async fn bridges_reservation_and_dispatch() {
        let harness = TestHarness::new();
        let cache = harness.service.order_cache();

        cache
            .store(&"O3".into(), &pids(&["P1", "P2"]))
            .await
            .unwrap();

        assert_eq!(
            cache.products(&"O3".into()).await.unwrap(),
            pids(&["P1", "P2"])
        );
        assert!(
            cache
                .products(&"unknown-order".into())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn order_key_cannot_become_a_product() {
        let harness = TestHarness::new();

        let err = harness
            .service
            .update_stock(&harness.ctx, &UpdateStockRequest::new("ORDER_O1", Some(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(harness.table.record_count().await, 0);
    }

    #[tokio::test]
    async fn caching_an_order_never_overwrites_an_item() {
        let harness = TestHarness::new();
        harness.seed("ORDER_O1", 5, &[]).await;

        let err = harness
            .service
            .remember_order(&harness.ctx, &"O1".into(), &pids(&["P1"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::DataAccess(_)));
        let item = harness.item("ORDER_O1").await;
        assert_eq!(item.current_stock_level(), 5);
    }
}

mod stock_updates {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_requests_without_side_effects() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        let writes_before = harness.table.item_write_count();

        let invalid = [
            UpdateStockRequest::new("P1-valid", Some(0)),
            UpdateStockRequest::new("P1-valid", Some(-1)),
            UpdateStockRequest::new("ab", Some(5)),
            UpdateStockRequest::new("P1-valid", None),
        ];
        for request in invalid {
            let err = harness
                .service
                .update_stock(&harness.ctx, &request)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
            assert!(!err.is_retryable());
        }

        assert_eq!(harness.table.item_write_count(), writes_before);
        assert!(harness.published_types().is_empty());
    }

    #[tokio::test]
    async fn keeps_reservations_when_level_changes() {
        let harness = TestHarness::new();
        harness.seed("SKU-1", 5, &["O1", "O2"]).await;

        let item = harness
            .service
            .update_stock(&harness.ctx, &UpdateStockRequest::new("SKU-1", Some(8)))
            .await
            .unwrap();

        assert_eq!(item.current_stock_level(), 8);
        assert_eq!(item.reserved_stock_level(), 2);
        assert_eq!(item.available_stock_level(), 6);
    }

    #[tokio::test]
    async fn retries_after_a_conflicting_write() {
        let harness = TestHarness::new();
        harness.seed("SKU-1", 5, &[]).await;
        harness
            .table
            .interleave_write(&ProductId::new("SKU-1"), |record| {
                record.stock_orders.insert(OrderNumber::new("O7"));
                record.reserved_stock_level += 1;
            })
            .await;

        let item = harness
            .service
            .update_stock(&harness.ctx, &UpdateStockRequest::new("SKU-1", Some(9)))
            .await
            .unwrap();

        assert_eq!(item.current_stock_level(), 9);
        assert!(item.has_reservation_for(&OrderNumber::new("O7")));
    }
}

mod store_failures {
    use super::*;

    #[tokio::test]
    async fn outage_surfaces_as_retryable_data_access() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        harness.table.set_unavailable(true);

        let err = harness
            .service
            .reserve_stock_for_order(&harness.ctx, &"O1".into(), &pids(&["P1"]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::DataAccess(_)));
        assert!(err.is_retryable());
        assert!(harness.published_types().is_empty());
    }

    #[tokio::test]
    async fn failed_write_mid_order_is_completed_on_redelivery() {
        let harness = TestHarness::new();
        harness.seed("P1", 5, &[]).await;
        harness.seed("P2", 5, &[]).await;
        harness.table.fail_writes_for(&ProductId::new("P2")).await;

        let err = harness
            .service
            .reserve_stock_for_order(&harness.ctx, &"O1".into(), &pids(&["P1", "P2"]), None)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(harness.item("P1").await.reserved_stock_level(), 1);

        harness.table.clear_write_failures().await;
        assert!(harness.reserve("O1", &["P1", "P2"]).await.is_reserved());

        assert_eq!(harness.item("P1").await.reserved_stock_level(), 1);
        assert_eq!(harness.item("P2").await.reserved_stock_level(), 1);
    }
}
