use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    InventoryItemRecord, OrderNumber, OrderRecord, ProductId, Result, StoreError, Version,
    table::{InventoryTable, PutOptions},
};

type ConcurrentWrite = Box<dyn FnOnce(&mut InventoryItemRecord) + Send + Sync>;

#[derive(Debug, Clone)]
enum StoredRecord {
    Item(InventoryItemRecord),
    Order(OrderRecord),
}

/// In-memory inventory table for testing and local runs.
///
/// Provides the same conditional-write semantics as a real key-value store,
/// plus hooks to simulate outages and concurrent writers.
#[derive(Clone, Default)]
pub struct InMemoryInventoryTable {
    records: Arc<RwLock<HashMap<String, StoredRecord>>>,
    concurrent_writes: Arc<RwLock<HashMap<String, Vec<ConcurrentWrite>>>>,
    failing_writes: Arc<RwLock<HashSet<String>>>,
    unavailable: Arc<AtomicBool>,
    item_writes: Arc<AtomicUsize>,
}

impl InMemoryInventoryTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes writes to the item for `product_id` fail with `Unavailable`.
    pub async fn fail_writes_for(&self, product_id: &ProductId) {
        self.failing_writes
            .write()
            .await
            .insert(InventoryItemRecord::partition_key(product_id));
    }

    /// Clears all write failures registered with [`Self::fail_writes_for`].
    pub async fn clear_write_failures(&self) {
        self.failing_writes.write().await.clear();
    }

    /// Simulates another writer updating the item for `product_id` between
    /// the caller's read and its next write.
    ///
    /// The mutation is applied to the stored record and its version bumped
    /// right before the next `put_item` for that product is checked.
    pub async fn interleave_write(
        &self,
        product_id: &ProductId,
        mutation: impl FnOnce(&mut InventoryItemRecord) + Send + Sync + 'static,
    ) {
        self.concurrent_writes
            .write()
            .await
            .entry(InventoryItemRecord::partition_key(product_id))
            .or_default()
            .push(Box::new(mutation));
    }

    /// Returns the number of successful item writes.
    pub fn item_write_count(&self) -> usize {
        self.item_writes.load(Ordering::SeqCst)
    }

    /// Returns the number of stored records of any type.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("table is unavailable".to_string()));
        }
        Ok(())
    }

    async fn take_concurrent_write(&self, key: &str) -> Option<ConcurrentWrite> {
        let mut pending = self.concurrent_writes.write().await;
        let queue = pending.get_mut(key)?;
        if queue.is_empty() {
            return None;
        }
        Some(queue.remove(0))
    }
}

#[async_trait]
impl InventoryTable for InMemoryInventoryTable {
    async fn get_item(&self, product_id: &ProductId) -> Result<Option<InventoryItemRecord>> {
        self.check_available()?;

        let key = InventoryItemRecord::partition_key(product_id);
        match self.records.read().await.get(&key) {
            None => Ok(None),
            Some(StoredRecord::Item(record)) => Ok(Some(record.clone())),
            Some(StoredRecord::Order(_)) => Err(StoreError::UnexpectedRecord {
                key,
                expected: InventoryItemRecord::TYPE,
            }),
        }
    }

    async fn put_item(
        &self,
        mut record: InventoryItemRecord,
        options: PutOptions,
    ) -> Result<Version> {
        self.check_available()?;

        let key = record.pk.clone();
        if self.failing_writes.read().await.contains(&key) {
            return Err(StoreError::Unavailable(format!("write to {key} failed")));
        }

        let concurrent = self.take_concurrent_write(&key).await;
        let mut records = self.records.write().await;

        if let Some(mutation) = concurrent
            && let Some(StoredRecord::Item(stored)) = records.get_mut(&key)
        {
            mutation(stored);
            stored.version = stored.version.next();
        }

        let current_version = match records.get(&key) {
            None => Version::initial(),
            Some(StoredRecord::Item(stored)) => stored.version,
            Some(StoredRecord::Order(_)) => {
                return Err(StoreError::UnexpectedRecord {
                    key,
                    expected: InventoryItemRecord::TYPE,
                });
            }
        };

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            tracing::debug!(%key, %expected, actual = %current_version, "conditional write rejected");
            return Err(StoreError::ConcurrencyConflict {
                key,
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        record.version = new_version;
        records.insert(key, StoredRecord::Item(record));
        self.item_writes.fetch_add(1, Ordering::SeqCst);

        Ok(new_version)
    }

    async fn get_order(&self, order_number: &OrderNumber) -> Result<Option<OrderRecord>> {
        self.check_available()?;

        let key = OrderRecord::partition_key(order_number);
        match self.records.read().await.get(&key) {
            None => Ok(None),
            Some(StoredRecord::Order(record)) => Ok(Some(record.clone())),
            Some(StoredRecord::Item(_)) => Err(StoreError::UnexpectedRecord {
                key,
                expected: OrderRecord::TYPE,
            }),
        }
    }

    async fn put_order(&self, record: OrderRecord) -> Result<()> {
        self.check_available()?;

        let key = record.pk.clone();
        let mut records = self.records.write().await;
        if let Some(StoredRecord::Item(_)) = records.get(&key) {
            return Err(StoreError::UnexpectedRecord {
                key,
                expected: OrderRecord::TYPE,
            });
        }
        records.insert(key, StoredRecord::Order(record));
        Ok(())
    }
}
