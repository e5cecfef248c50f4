//! Startup cache recovery
//!
//! Runs once, before the bus subscription and the HTTP listener start, so the
//! cache is never queried while it is known to lag behind the store.

use std::sync::Arc;

use super::cache::OrderCache;
use super::storage::OrderStore;

/// Load every persisted order into the cache
///
/// Returns the number of orders loaded. A store error is logged and the cache
/// starts empty; it fills up again as new messages arrive.
pub fn recover(store: &dyn OrderStore, cache: &OrderCache) -> usize {
    let orders = match store.load_all() {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!(error = %e, "Cache recovery failed, starting with an empty cache");
            return 0;
        }
    };

    let loaded = orders.len();
    for order in orders {
        let order_uid = order.order_uid.clone();
        cache.set(order_uid, Arc::new(order));
    }

    tracing::info!(loaded, cached = cache.count(), "Cache recovered from store");
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::{RedbOrderStore, SaveOutcome, StorageError, StorageResult};
    use shared::order::Order;

    fn order(order_uid: &str) -> Order {
        Order {
            order_uid: order_uid.to_string(),
            ..Default::default()
        }
    }

    struct UnreachableStore;

    impl OrderStore for UnreachableStore {
        fn save(&self, _order: &Order) -> StorageResult<SaveOutcome> {
            Err(StorageError::Task("unreachable".into()))
        }
        fn load_all(&self) -> StorageResult<Vec<Order>> {
            Err(StorageError::Task("unreachable".into()))
        }
        fn get(&self, _order_uid: &str) -> StorageResult<Option<Order>> {
            Err(StorageError::Task("unreachable".into()))
        }
        fn count(&self) -> StorageResult<u64> {
            Err(StorageError::Task("unreachable".into()))
        }
        fn ping(&self) -> StorageResult<()> {
            Err(StorageError::Task("unreachable".into()))
        }
    }

    #[test]
    fn test_recover_loads_every_order() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        for i in 0..25 {
            store.save(&order(&format!("order-{i}"))).unwrap();
        }
        let cache = OrderCache::new();

        let loaded = recover(&store, &cache);

        assert_eq!(loaded, 25);
        assert_eq!(cache.count(), 25);
        for i in 0..25 {
            let id = format!("order-{i}");
            assert_eq!(cache.get(&id).unwrap().order_uid, id);
        }
    }

    #[test]
    fn test_recover_from_empty_store() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        let cache = OrderCache::new();

        assert_eq!(recover(&store, &cache), 0);
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn test_recover_skips_corrupt_rows() {
        let store = RedbOrderStore::open_in_memory().unwrap();
        store.save(&order("good")).unwrap();
        store.insert_raw("bad", b"\x00\x01").unwrap();
        let cache = OrderCache::new();

        assert_eq!(recover(&store, &cache), 1);
        assert!(cache.get("good").is_some());
        assert!(cache.get("bad").is_none());
    }

    #[test]
    fn test_store_error_leaves_cache_empty() {
        let cache = OrderCache::new();

        assert_eq!(recover(&UnreachableStore, &cache), 0);
        assert_eq!(cache.count(), 0);
    }
}
