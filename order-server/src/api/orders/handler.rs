//! Order API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use shared::order::Order;
use std::sync::Arc;

use crate::core::ServerState;
use crate::orders::QueryError;
use crate::utils::{AppError, AppResult};

/// Query params for order lookup
#[derive(Debug, Deserialize)]
pub struct OrderLookup {
    pub id: Option<String>,
}

impl From<QueryError> for AppError {
    fn from(e: QueryError) -> Self {
        match &e {
            QueryError::BadRequest => AppError::validation(e.to_string()),
            QueryError::NotFound(_) => AppError::not_found(e.to_string()),
        }
    }
}

/// Get order by id (`GET /api/order?id=...`)
pub async fn get_order(
    State(state): State<ServerState>,
    Query(params): Query<OrderLookup>,
) -> AppResult<Json<Arc<Order>>> {
    let order = state.query().lookup(params.id.as_deref())?;
    tracing::debug!(order_uid = %order.order_uid, "Order served");
    Ok(Json(order))
}
