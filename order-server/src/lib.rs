//! Order Server - 订单摄取与查询服务
//!
//! # 架构概述
//!
//! 订单从持久化消息总线进入，校验后写入 redb，再放进内存缓存；
//! HTTP 查询只读缓存。
//!
//! - **消息总线** (`message`): redb journal + durable 订阅 + TCP 入口
//! - **订单** (`orders`): 存储、缓存、启动恢复、摄取流水线、查询
//! - **HTTP API** (`api`): `/api/order`、健康检查、首页
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、错误、启动流程
//! ├── message/       # 消息总线
//! ├── orders/        # 订单存储与摄取
//! ├── services/      # HTTP 服务组装
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误响应、日志
//! ```

pub mod api;
pub mod core;
pub mod message;
pub mod orders;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerError, ServerState};
pub use message::{MessageBus, MessageJournal, Subscription};
pub use orders::{
    IngestOutcome, IngestPipeline, OrderCache, OrderQuery, OrderStore, RedbOrderStore, SaveOutcome,
};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// 设置运行环境并返回配置
///
/// 1. 加载 `.env` (不存在则忽略)
/// 2. 从环境变量加载 [`Config`]
/// 3. 按配置初始化日志：生产环境输出 JSON，`log_dir` 设置时额外写入滚动文件
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    init_logger_with_file(
        &config.log_level,
        config.is_production(),
        config.log_dir.as_deref(),
    )?;

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ____           __
  / __ \_________/ /__  __________
 / / / / ___/ __  / _ \/ ___/ ___/
/ /_/ / /  / /_/ /  __/ /  (__  )
\____/_/   \__,_/\___/_/  /____/
    "#
    );
}
