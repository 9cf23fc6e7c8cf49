pub mod error;
pub mod memory;
pub mod record;
pub mod table;

pub use common::{OrderNumber, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryInventoryTable;
pub use record::{InventoryItemRecord, OrderRecord, Version};
pub use table::{InventoryTable, PutOptions};
