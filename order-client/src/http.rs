//! HTTP client for the order query API

use reqwest::StatusCode;
use shared::order::Order;

use crate::error::{ClientError, ClientResult};

/// Client for `GET /api/order`
#[derive(Debug, Clone)]
pub struct OrderHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl OrderHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing connection pool
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch an order by identifier
    pub async fn get_order(&self, order_uid: &str) -> ClientResult<Order> {
        let response = self
            .client
            .get(format!("{}/api/order", self.base_url))
            .query(&[("id", order_uid)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<Order>().await?),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(order_uid.to_string())),
            StatusCode::BAD_REQUEST => Err(ClientError::Validation(error_message(response).await)),
            status => Err(ClientError::InvalidResponse(format!(
                "unexpected status {}: {}",
                status,
                error_message(response).await
            ))),
        }
    }
}

/// `message` field of an error body, or the raw text
async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text)
}
