//! 消息总线消息类型定义
//!
//! 这些类型在 order-server 和 order-client 之间共享，用于
//! 总线 TCP 入口的帧编码。

mod codec;

pub use codec::{MAX_PAYLOAD_LEN, read_from_stream, write_to_stream};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// 总线事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 发布消息到频道 (客户端 -> 服务器)
    Publish = 1,
    /// 发布确认 (服务器 -> 客户端)
    PublishAck = 2,
    /// 错误响应 (服务器 -> 客户端)
    Error = 3,
}

impl TryFrom<u8> for EventType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, FrameError> {
        match value {
            1 => Ok(EventType::Publish),
            2 => Ok(EventType::PublishAck),
            3 => Ok(EventType::Error),
            other => Err(FrameError::InvalidEventType(other)),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Publish => write!(f, "publish"),
            EventType::PublishAck => write!(f, "publish_ack"),
            EventType::Error => write!(f, "error"),
        }
    }
}

/// Wire codec errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("peer disconnected")]
    Disconnected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid event type: {0}")]
    InvalidEventType(u8),

    #[error("channel name is not valid UTF-8")]
    InvalidChannel,

    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// 发布确认载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAck {
    /// 消息在频道内的序号
    pub sequence: u64,
}

/// 错误载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub channel: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, channel: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            channel: channel.into(),
            payload,
        }
    }

    /// 创建发布消息
    pub fn publish(channel: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(EventType::Publish, channel, payload)
    }

    /// 创建发布确认 (沿用请求的 request_id)
    pub fn publish_ack(request: &BusMessage, sequence: u64) -> Result<Self, FrameError> {
        Ok(Self {
            request_id: request.request_id,
            event_type: EventType::PublishAck,
            channel: request.channel.clone(),
            payload: serde_json::to_vec(&PublishAck { sequence })?,
        })
    }

    /// 创建错误响应 (沿用请求的 request_id)
    pub fn error(request: &BusMessage, message: impl Into<String>) -> Result<Self, FrameError> {
        let payload = ErrorPayload {
            message: message.into(),
        };
        Ok(Self {
            request_id: request.request_id,
            event_type: EventType::Error,
            channel: request.channel.clone(),
            payload: serde_json::to_vec(&payload)?,
        })
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_byte() {
        assert_eq!(EventType::try_from(1).unwrap(), EventType::Publish);
        assert_eq!(EventType::try_from(3).unwrap(), EventType::Error);
        assert!(matches!(
            EventType::try_from(9),
            Err(FrameError::InvalidEventType(9))
        ));
    }

    #[test]
    fn test_ack_keeps_request_id() {
        let request = BusMessage::publish("orders", b"{}".to_vec());
        let ack = BusMessage::publish_ack(&request, 42).unwrap();

        assert_eq!(ack.request_id, request.request_id);
        assert_eq!(ack.event_type, EventType::PublishAck);
        let parsed: PublishAck = ack.parse_payload().unwrap();
        assert_eq!(parsed.sequence, 42);
    }

    #[test]
    fn test_error_payload() {
        let request = BusMessage::publish("orders", Vec::new());
        let reply = BusMessage::error(&request, "journal unavailable").unwrap();

        let parsed: ErrorPayload = reply.parse_payload().unwrap();
        assert_eq!(parsed.message, "journal unavailable");
        assert_eq!(reply.channel, "orders");
    }
}
