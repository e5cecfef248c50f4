//! 消息总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                      MessageBus                         │
//! │  ┌──────────────────────┐   ┌────────────────────────┐  │
//! │  │ MessageJournal (redb)│   │ Notify (新消息唤醒)     │  │
//! │  └──────────────────────┘   └────────────────────────┘  │
//! └──────────┬─────────────────────────────┬───────────────┘
//!            │ publish()                   │ subscribe()
//!            ▼                             ▼
//!     TCP 入口 / 进程内调用          Subscription (durable)
//! ```
//!
//! # 投递语义
//!
//! 至少一次 (at-least-once)：消息先写入 journal 再返回序号；订阅者处理完成后
//! 调用 `ack` 推进 durable cursor。进程在 ack 之前崩溃，重启后会重新投递。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::ConnectedClient;
use super::journal::{JournalResult, MessageJournal};
use super::subscription::Subscription;

/// 消息总线 - 负责消息持久化和订阅分发
///
/// # 职责
///
/// - 发布 (publish): 追加到 journal 并唤醒订阅者
/// - 订阅 (subscribe): 从 durable cursor 之后开始投递
/// - 客户端管理 (TCP 入口连接)
#[derive(Debug, Clone)]
pub struct MessageBus {
    journal: MessageJournal,
    /// 新消息通知
    notify: Arc<Notify>,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 已连接的发布端 (peer addr -> client)
    pub(crate) clients: Arc<DashMap<String, ConnectedClient>>,
}

impl MessageBus {
    /// 基于已打开的 journal 创建消息总线
    pub fn new(journal: MessageJournal, shutdown_token: CancellationToken) -> Self {
        Self {
            journal,
            notify: Arc::new(Notify::new()),
            shutdown_token,
            clients: Arc::new(DashMap::new()),
        }
    }

    /// 发布消息到频道
    ///
    /// 返回消息序号；返回时消息已持久化
    pub fn publish(&self, channel: &str, payload: &[u8]) -> JournalResult<u64> {
        let sequence = self.journal.append(channel, payload)?;
        tracing::debug!(channel, sequence, bytes = payload.len(), "Message published");
        self.notify.notify_waiters();
        Ok(sequence)
    }

    /// 创建 durable 订阅
    ///
    /// 从该 durable 名称上次确认的位置之后开始投递；首次订阅时登记 cursor，
    /// 之后该频道的消息要等它确认后才会被清理
    pub fn subscribe(&self, channel: &str, durable_name: &str) -> JournalResult<Subscription> {
        let position = self.journal.register(channel, durable_name)?;
        tracing::info!(
            channel,
            durable_name,
            position,
            "Durable subscription opened"
        );
        Ok(Subscription::new(
            self.journal.clone(),
            channel.to_string(),
            durable_name.to_string(),
            position,
            self.notify.clone(),
            self.shutdown_token.clone(),
        ))
    }

    /// 频道最新序号
    pub fn head(&self, channel: &str) -> JournalResult<u64> {
        self.journal.head(channel)
    }

    /// 获取关闭令牌
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 获取已连接客户端列表
    pub fn get_connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// 优雅关闭消息总线
    ///
    /// 取消订阅等待和 TCP 入口
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> MessageBus {
        MessageBus::new(
            MessageJournal::open_in_memory().unwrap(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_publish_returns_sequence() {
        let bus = bus();
        assert_eq!(bus.publish("orders", b"a").unwrap(), 1);
        assert_eq!(bus.publish("orders", b"b").unwrap(), 2);
        assert_eq!(bus.head("orders").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_subscription_sees_earlier_and_later_messages() {
        let bus = bus();
        bus.publish("orders", b"before").unwrap();

        let mut sub = bus.subscribe("orders", "svc").unwrap();
        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.payload, b"before");

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            publisher.publish("orders", b"after").unwrap();
        });

        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.payload, b"after");
    }

    #[tokio::test]
    async fn test_shutdown_ends_subscription() {
        let bus = bus();
        let mut sub = bus.subscribe("orders", "svc").unwrap();

        let closer = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            closer.shutdown();
        });

        assert!(sub.next().await.unwrap().is_none());
    }
}
