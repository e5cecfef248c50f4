use thiserror::Error;

use crate::message::JournalError;
use crate::orders::StorageError;

/// 启动阶段的致命错误
///
/// 只有初始化 (打开订单库、消息 journal、绑定端口) 会产生这些错误；
/// 运行期间单条消息的错误不会中断服务。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("订单库不可用: {0}")]
    Store(#[from] StorageError),

    #[error("消息 journal 不可用: {0}")]
    Journal(#[from] JournalError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 启动流程的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
