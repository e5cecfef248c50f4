use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{Config, Result};
use crate::message::{MessageBus, MessageJournal};
use crate::orders::{IngestPipeline, OrderCache, OrderQuery, OrderStore, RedbOrderStore, recover};

/// 服务状态 - 持有所有组件的共享引用
///
/// 使用 Arc 实现浅拷贝，axum 每个请求拿到的都是同一组组件。
///
/// # 组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | store | Arc<dyn OrderStore> | 持久化订单库 |
/// | cache | Arc<OrderCache> | 内存订单缓存 (唯一的共享可变结构) |
/// | bus | MessageBus | 持久化消息总线 |
/// | shutdown_token | CancellationToken | 全局关闭信号 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务配置
    pub config: Config,
    /// 持久化订单库
    pub store: Arc<dyn OrderStore>,
    /// 内存订单缓存
    pub cache: Arc<OrderCache>,
    /// 消息总线
    pub bus: MessageBus,
    /// 关闭信号令牌 (总线、摄取任务、HTTP 共用)
    pub shutdown_token: CancellationToken,
}

impl ServerState {
    /// 创建服务状态 (手动构造)
    ///
    /// 通常使用 [`initialize()`](Self::initialize) 代替；测试中用来注入内存库
    pub fn new(config: Config, store: Arc<dyn OrderStore>, journal: MessageJournal) -> Self {
        let shutdown_token = CancellationToken::new();
        Self {
            config,
            store,
            cache: Arc::new(OrderCache::new()),
            bus: MessageBus::new(journal, shutdown_token.clone()),
            shutdown_token,
        }
    }

    /// 初始化服务状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 订单库 (work_dir/database/orders.redb)，打开失败或探活失败直接返回错误
    /// 3. 消息 journal (work_dir/bus/journal.redb)
    ///
    /// 任一步失败都是致命的，不做重试。
    pub fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_path = config.database_path();
        let store = RedbOrderStore::open(&db_path)?;
        tracing::info!("Order store ready at {}", db_path.display());

        let journal_path = config.journal_path();
        let journal = MessageJournal::open(&journal_path)?;
        tracing::info!("Message journal ready at {}", journal_path.display());

        Ok(Self::new(config.clone(), Arc::new(store), journal))
    }

    /// 从订单库恢复缓存
    ///
    /// 必须在订阅和 HTTP 监听启动之前调用
    pub fn recover_cache(&self) -> usize {
        recover(self.store.as_ref(), &self.cache)
    }

    /// 摄取流水线 (共享同一个库和缓存)
    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(self.store.clone(), self.cache.clone())
    }

    /// 查询服务
    pub fn query(&self) -> OrderQuery {
        OrderQuery::new(self.cache.clone())
    }

    /// 触发全局关闭
    pub fn shutdown(&self) {
        self.bus.shutdown();
        self.shutdown_token.cancel();
    }
}
