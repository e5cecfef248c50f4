//! Order ingestion core
//!
//! - [`storage`] - durable redb store with idempotent insert
//! - [`cache`] - concurrent in-memory order map
//! - [`recovery`] - startup cache fill from the store
//! - [`pipeline`] - bus message → validate → persist → cache → ack
//! - [`query`] - cache-only lookup

pub mod cache;
pub mod pipeline;
pub mod query;
pub mod recovery;
pub mod storage;

pub use cache::OrderCache;
pub use pipeline::{IngestOutcome, IngestPipeline, RejectReason};
pub use query::{OrderQuery, QueryError};
pub use recovery::recover;
pub use storage::{OrderStore, RedbOrderStore, SaveOutcome, StorageError, StorageResult};
