//! Implementations of the collaborator traits.

pub mod catalogue;
pub mod order_cache;
pub mod publisher;
pub mod repository;

pub use catalogue::InMemoryProductCatalogue;
pub use order_cache::TableOrderCache;
pub use publisher::InMemoryEventPublisher;
pub use repository::TableInventoryItemRepository;
