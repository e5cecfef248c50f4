//! redb-based persistence for ingested orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_uid` | JSON-serialized `Order` | Durable order documents |
//!
//! # Idempotency
//!
//! [`OrderStore::save`] is a conditional insert: the existence check and the
//! insert run inside one write transaction, and redb serializes write
//! transactions, so two deliveries of the same order can never both insert.
//! The second one reports [`SaveOutcome::AlreadyPresent`] and leaves the stored
//! document untouched (first write wins).
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns the row
//! survives a crash. The ingestion pipeline relies on this before it updates
//! the cache and acknowledges the bus message.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing orders: key = order_uid, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a conditional insert
///
/// Both variants are success: callers must not treat `AlreadyPresent` as an
/// error, it is what makes redelivery safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The order was written
    Inserted,
    /// A row with the same identifier already existed and was left as is
    AlreadyPresent,
}

impl SaveOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, SaveOutcome::Inserted)
    }
}

/// Durable order store
///
/// Implementations must be safe to share between the ingestion task, the
/// recovery loader and the health endpoint.
pub trait OrderStore: Send + Sync {
    /// Insert the order unless its identifier is already stored
    fn save(&self, order: &Order) -> StorageResult<SaveOutcome>;

    /// Read every stored order
    ///
    /// Rows that fail to deserialize are logged and skipped.
    fn load_all(&self) -> StorageResult<Vec<Order>>;

    /// Look up a single stored order
    fn get(&self, order_uid: &str) -> StorageResult<Option<Order>>;

    /// Number of stored orders
    fn count(&self) -> StorageResult<u64>;

    /// Liveness check
    fn ping(&self) -> StorageResult<()>;
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct RedbOrderStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbOrderStore").finish_non_exhaustive()
    }
}

impl RedbOrderStore {
    /// Open or create the database at the given path
    ///
    /// Fails fast: there is no retry. A database that cannot be opened or
    /// that fails the liveness check is reported to the caller, which treats
    /// it as fatal at startup.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self::init(db)?;
        store.ping()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create the table so that read transactions never see it missing
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl OrderStore for RedbOrderStore {
    fn save(&self, order: &Order) -> StorageResult<SaveOutcome> {
        let value = serde_json::to_vec(order)?;

        let txn = self.db.begin_write()?;
        let outcome = {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            if table.get(order.order_uid.as_str())?.is_some() {
                SaveOutcome::AlreadyPresent
            } else {
                table.insert(order.order_uid.as_str(), value.as_slice())?;
                SaveOutcome::Inserted
            }
        };

        match outcome {
            SaveOutcome::Inserted => txn.commit()?,
            // Nothing written, no need to pay for a durable commit
            SaveOutcome::AlreadyPresent => txn.abort()?,
        }

        Ok(outcome)
    }

    fn load_all(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            match serde_json::from_slice::<Order>(value.value()) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    tracing::warn!(
                        order_uid = %key.value(),
                        error = %e,
                        "Skipping undecodable order row"
                    );
                }
            }
        }

        Ok(orders)
    }

    fn get(&self, order_uid: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_uid)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ORDERS_TABLE)?;
        Ok(())
    }
}

#[cfg(test)]
impl RedbOrderStore {
    /// Write raw bytes under a key, bypassing serialization
    pub(crate) fn insert_raw(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }
}
