//! Order Client - 订单服务客户端工具
//!
//! - [`BusClient`] - 总线 TCP 入口的发布客户端
//! - [`OrderHttpClient`] - `/api/order` 查询客户端
//!
//! 两个命令行工具基于这些类型：
//! - `order-publisher` - 发布订单文件到总线
//! - `order-stress` - 查询接口压力测试

pub mod bus;
pub mod error;
pub mod http;

pub use bus::BusClient;
pub use error::{ClientError, ClientResult};
pub use http::OrderHttpClient;

/// 初始化命令行工具日志 (`RUST_LOG` 优先)
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
