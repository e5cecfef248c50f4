//! Order lookup
//!
//! Read-only access to the cache. The store is never consulted here, so a slow
//! or failing store cannot affect query latency.

use shared::order::Order;
use std::sync::Arc;
use thiserror::Error;

use super::cache::OrderCache;

/// Lookup failures, surfaced to HTTP callers as 400 and 404
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("parameter id is required")]
    BadRequest,

    #[error("order {0} not found")]
    NotFound(String),
}

/// Query service over the order cache
#[derive(Debug, Clone)]
pub struct OrderQuery {
    cache: Arc<OrderCache>,
}

impl OrderQuery {
    pub fn new(cache: Arc<OrderCache>) -> Self {
        Self { cache }
    }

    /// Look up an order by identifier
    ///
    /// A missing or empty identifier is a bad request, not a miss.
    pub fn lookup(&self, order_uid: Option<&str>) -> Result<Arc<Order>, QueryError> {
        let order_uid = match order_uid {
            Some(id) if !id.is_empty() => id,
            _ => return Err(QueryError::BadRequest),
        };

        self.cache
            .get(order_uid)
            .ok_or_else(|| QueryError::NotFound(order_uid.to_string()))
    }
}
