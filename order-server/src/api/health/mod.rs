//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 简单健康检查 |
//! | /health/detailed | GET | 详细健康检查 |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "cached_orders": 42
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::SystemTime;

use crate::core::ServerState;
use crate::message::ConnectedClient;

/// 健康检查路由
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

/// 简单健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (healthy)
    status: &'static str,
    /// 版本号
    version: &'static str,
    /// 缓存中的订单数
    cached_orders: usize,
}

/// 详细健康检查响应
#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    /// 运行时间 (秒)
    uptime_seconds: u64,
    cached_orders: usize,
    /// 各组件检查结果
    checks: HealthChecks,
}

/// 健康检查详情
#[derive(Serialize)]
pub struct HealthChecks {
    /// 订单库检查
    store: CheckResult,
    /// 消息总线检查
    message_bus: BusCheck,
}

/// 单项检查结果
#[derive(Serialize)]
pub struct CheckResult {
    /// 状态 (ok | error)
    status: &'static str,
    /// 延迟 (毫秒)
    latency_ms: Option<u64>,
    /// 错误信息
    message: Option<String>,
}

impl CheckResult {
    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

/// 消息总线状态
#[derive(Serialize)]
pub struct BusCheck {
    status: &'static str,
    channel: String,
    /// 频道最新序号
    #[serde(skip_serializing_if = "Option::is_none")]
    head_sequence: Option<u64>,
    connected_clients: Vec<ConnectedClient>,
}

// 服务器启动时间 (由 Server::run 记录)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

/// 记录启动时间，只有第一次调用生效
pub fn mark_started() {
    START_TIME.get_or_init(SystemTime::now);
}

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 基础健康检查
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        cached_orders: state.cache.count(),
    })
}

/// 包含组件状态的详细健康检查
pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    // 检查订单库: 探活读事务
    let store = state.store.clone();
    let db_start = std::time::Instant::now();
    let store_check = match tokio::task::spawn_blocking(move || store.ping()).await {
        Ok(Ok(())) => CheckResult::ok_with_latency(db_start.elapsed().as_millis() as u64),
        Ok(Err(e)) => CheckResult::error(format!("Store error: {}", e)),
        Err(e) => CheckResult::error(format!("Store check failed: {}", e)),
    };

    // 检查消息总线
    let channel = state.config.order_channel.clone();
    let bus_check = match state.bus.head(&channel) {
        Ok(head) => BusCheck {
            status: "ok",
            channel,
            head_sequence: Some(head),
            connected_clients: state.bus.get_connected_clients(),
        },
        Err(e) => {
            tracing::warn!("Journal health check failed: {}", e);
            BusCheck {
                status: "error",
                channel,
                head_sequence: None,
                connected_clients: state.bus.get_connected_clients(),
            }
        }
    };

    let all_ok = store_check.status == "ok" && bus_check.status == "ok";

    Json(DetailedHealthResponse {
        status: if all_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        cached_orders: state.cache.count(),
        checks: HealthChecks {
            store: store_check,
            message_bus: bus_check,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uptime_counts_from_start_not_first_request() {
        mark_started();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        // First request after start already sees the elapsed second
        assert!(get_uptime_seconds() >= 1);
    }
}
