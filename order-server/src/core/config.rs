use std::path::PathBuf;

/// 服务配置 - 订单服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖 (也可写入 `.env`)：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (database/, bus/) |
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | BUS_TCP_PORT | 4222 | 消息总线 TCP 入口端口 |
/// | ORDER_CHANNEL | orders | 订单频道 |
/// | DURABLE_NAME | order-service-durable | durable 订阅名称 |
/// | STATIC_DIR | static | 首页静态文件目录 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 滚动日志目录 |
/// | ENVIRONMENT | development | 运行环境 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭时等待摄取任务的超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/var/lib/orders HTTP_PORT=9000 cargo run -p order-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和消息 journal
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 消息总线 TCP 入口端口 (发布端直连)
    pub bus_tcp_port: u16,
    /// 订单频道名称
    pub order_channel: String,
    /// durable 订阅名称 (重启后从该名称的确认位置继续)
    pub durable_name: String,
    /// 首页静态文件目录
    pub static_dir: String,
    /// 日志级别
    pub log_level: String,
    /// 滚动日志目录 (未设置则只输出到 stdout)
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            bus_tcp_port: std::env::var("BUS_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4222),
            order_channel: std::env::var("ORDER_CHANNEL").unwrap_or_else(|_| "orders".into()),
            durable_name: std::env::var("DURABLE_NAME")
                .unwrap_or_else(|_| "order-service-durable".into()),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16, bus_tcp_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.bus_tcp_port = bus_tcp_port;
        config
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 订单库路径
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("orders.redb")
    }

    /// 消息 journal 目录 (work_dir/bus)
    pub fn bus_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("bus")
    }

    /// 消息 journal 路径
    pub fn journal_path(&self) -> PathBuf {
        self.bus_dir().join("journal.redb")
    }

    /// 消息总线 TCP 监听地址
    pub fn bus_listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.bus_tcp_port)
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.bus_dir())?;
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
