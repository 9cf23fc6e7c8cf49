//! Shared application state and its default in-memory wiring.

use std::sync::Arc;

use acl::{BatchProcessor, ExternalEventHandler};
use domain::{
    InMemoryEventPublisher, InMemoryProductCatalogue, InventoryItemService,
    TableInventoryItemRepository, TableOrderCache,
};
use inventory_store::InMemoryInventoryTable;

use crate::config::Config;

/// Inventory service over the in-memory table and adapters.
pub type InventoryService = InventoryItemService<
    TableInventoryItemRepository<InMemoryInventoryTable>,
    TableOrderCache<InMemoryInventoryTable>,
    InMemoryEventPublisher,
    InMemoryProductCatalogue,
>;

/// Batch processor feeding [`InventoryService`].
pub type EventProcessor = BatchProcessor<
    TableInventoryItemRepository<InMemoryInventoryTable>,
    TableOrderCache<InMemoryInventoryTable>,
    InMemoryEventPublisher,
    InMemoryProductCatalogue,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub service: Arc<InventoryService>,
    pub processor: EventProcessor,
    pub table: InMemoryInventoryTable,
    pub publisher: InMemoryEventPublisher,
    pub catalogue: InMemoryProductCatalogue,
}

/// Wires the service, the ACL and their in-memory collaborators.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    let settings = config.inventory_settings();
    let table = InMemoryInventoryTable::new();
    let publisher = InMemoryEventPublisher::new(&config.env, config.event_bus_name.as_str());
    let catalogue = InMemoryProductCatalogue::new();

    let service = Arc::new(InventoryItemService::new(
        TableInventoryItemRepository::new(table.clone()),
        TableOrderCache::new(table.clone(), settings.order_cache_ttl),
        publisher.clone(),
        catalogue.clone(),
        settings,
    ));
    let processor = BatchProcessor::new(ExternalEventHandler::new(Arc::clone(&service)));

    tracing::info!(
        env = %config.env,
        event_bus = %config.event_bus_name,
        "inventory service wired"
    );

    Arc::new(AppState {
        service,
        processor,
        table,
        publisher,
        catalogue,
    })
}
