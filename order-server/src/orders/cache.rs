//! In-memory order cache
//!
//! Serves every query. Entries are shared immutable snapshots (`Arc<Order>`):
//! a write swaps the whole pointer under the write lock, so a reader either
//! sees the previous order or the new one, never a mix of both.
//!
//! The lock is a `parking_lot::RwLock` and is only held for the map operation
//! itself, never across an `.await`.

use parking_lot::RwLock;
use shared::order::Order;
use std::collections::HashMap;
use std::sync::Arc;

/// Concurrent order_uid → order map
#[derive(Debug, Default)]
pub struct OrderCache {
    data: RwLock<HashMap<String, Arc<Order>>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the order stored under `order_uid`
    pub fn set(&self, order_uid: impl Into<String>, order: Arc<Order>) {
        let order_uid = order_uid.into();
        tracing::debug!(order_uid = %order_uid, "Order cached");
        self.data.write().insert(order_uid, order);
    }

    pub fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        self.data.read().get(order_uid).cloned()
    }

    /// Snapshot of every cached order, in no particular order
    pub fn list_all(&self) -> Vec<Arc<Order>> {
        self.data.read().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.data.read().len()
    }
}
