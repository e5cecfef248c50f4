//! redb-based message journal for the durable bus
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `messages` | `(channel, sequence)` | payload bytes | Append-only message log |
//! | `heads` | `channel` | `u64` | Last assigned sequence per channel |
//! | `cursors` | `(channel, durable_name)` | `u64` | Last acknowledged sequence per durable consumer |
//!
//! Sequences start at 1 and are gap-free per channel. A cursor of 0 means
//! nothing has been acknowledged yet.
//!
//! Retention: once every durable consumer of a channel has acknowledged a
//! message it is removed from `messages`. A durable name that first subscribes
//! after that only sees what is still retained.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing messages: key = (channel, sequence), value = raw payload
const MESSAGES_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("messages");

/// Table for channel heads: key = channel, value = last sequence
const HEADS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("heads");

/// Table for durable cursors: key = (channel, durable_name), value = acked sequence
const CURSORS_TABLE: TableDefinition<(&str, &str), u64> = TableDefinition::new("cursors");

/// Journal errors
#[derive(Debug, Error)]
pub enum JournalError {
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

    #[error("Journal task failed: {0}")]
    Task(String),
}

pub type JournalResult<T> = Result<T, JournalError>;

/// A journaled message handed to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// Durable message log backed by redb
#[derive(Clone)]
pub struct MessageJournal {
    db: Arc<Database>,
}

impl std::fmt::Debug for MessageJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageJournal").finish_non_exhaustive()
    }
}

impl MessageJournal {
    /// Open or create the journal at the given path
    pub fn open(path: impl AsRef<Path>) -> JournalResult<Self> {
        Self::init(Database::create(path)?)
    }

    /// Open an in-memory journal (for testing)
    pub fn open_in_memory() -> JournalResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> JournalResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MESSAGES_TABLE)?;
            let _ = write_txn.open_table(HEADS_TABLE)?;
            let _ = write_txn.open_table(CURSORS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Append a message and return its sequence
    ///
    /// The message is durable once this returns.
    pub fn append(&self, channel: &str, payload: &[u8]) -> JournalResult<u64> {
        let txn = self.db.begin_write()?;
        let sequence = {
            let mut heads = txn.open_table(HEADS_TABLE)?;
            let next = heads.get(channel)?.map(|g| g.value()).unwrap_or(0) + 1;
            heads.insert(channel, next)?;

            let mut messages = txn.open_table(MESSAGES_TABLE)?;
            messages.insert((channel, next), payload)?;
            next
        };
        txn.commit()?;
        Ok(sequence)
    }

    /// Read up to `limit` messages with a sequence greater than `after`
    pub fn read_after(&self, channel: &str, after: u64, limit: usize) -> JournalResult<Vec<Delivery>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGES_TABLE)?;

        let range_start = (channel, after.saturating_add(1));
        let range_end = (channel, u64::MAX);

        let mut deliveries = Vec::new();
        for result in table.range(range_start..=range_end)?.take(limit) {
            let (key, value) = result?;
            deliveries.push(Delivery {
                sequence: key.value().1,
                payload: value.value().to_vec(),
            });
        }
        Ok(deliveries)
    }

    /// Last sequence assigned on `channel` (0 if empty)
    pub fn head(&self, channel: &str) -> JournalResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HEADS_TABLE)?;
        Ok(table.get(channel)?.map(|g| g.value()).unwrap_or(0))
    }

    /// Last sequence acknowledged by `durable_name` on `channel` (0 if none)
    pub fn cursor(&self, channel: &str, durable_name: &str) -> JournalResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CURSORS_TABLE)?;
        Ok(table
            .get((channel, durable_name))?
            .map(|g| g.value())
            .unwrap_or(0))
    }

    /// Register `durable_name` on `channel` and return its cursor
    ///
    /// A registered durable holds back retention until it acknowledges.
    pub fn register(&self, channel: &str, durable_name: &str) -> JournalResult<u64> {
        let txn = self.db.begin_write()?;
        let position = {
            let mut cursors = txn.open_table(CURSORS_TABLE)?;
            let existing = cursors.get((channel, durable_name))?.map(|g| g.value());
            match existing {
                Some(position) => position,
                None => {
                    cursors.insert((channel, durable_name), 0)?;
                    0
                }
            }
        };
        txn.commit()?;
        Ok(position)
    }

    /// Record that `durable_name` has handled everything up to `sequence`
    ///
    /// Cursors only move forward; committing an older sequence is a no-op.
    /// Messages at or below the lowest cursor of the channel are pruned in the
    /// same transaction.
    pub fn commit(&self, channel: &str, durable_name: &str, sequence: u64) -> JournalResult<()> {
        let txn = self.db.begin_write()?;
        let pruned = {
            let mut cursors = txn.open_table(CURSORS_TABLE)?;
            let current = cursors
                .get((channel, durable_name))?
                .map(|g| g.value())
                .unwrap_or(0);
            if sequence <= current {
                0
            } else {
                cursors.insert((channel, durable_name), sequence)?;

                // Lowest acknowledged position over every durable on the channel
                let mut low_water = sequence;
                for result in cursors.iter()? {
                    let (key, value) = result?;
                    if key.value().0 == channel {
                        low_water = low_water.min(value.value());
                    }
                }

                let mut messages = txn.open_table(MESSAGES_TABLE)?;
                let mut acked = Vec::new();
                for result in messages.range((channel, 0)..=(channel, low_water))? {
                    let (key, _) = result?;
                    acked.push(key.value().1);
                }
                for seq in &acked {
                    messages.remove((channel, *seq))?;
                }
                acked.len()
            }
        };
        txn.commit()?;

        if pruned > 0 {
            tracing::trace!(channel, durable_name, pruned, "Pruned acknowledged messages");
        }
        Ok(())
    }
}
