//! Order API Module
//!
//! Read-only access to cached orders. Writes only arrive through the bus.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/order", get(handler::get_order))
}
