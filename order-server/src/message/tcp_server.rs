//! TCP 入口实现
//!
//! 负责处理发布端连接：
//! - 监听连接
//! - 读取 Publish 帧并写入 journal
//! - 回复 PublishAck / Error (沿用请求的 request_id)

use std::net::SocketAddr;

use shared::message::{BusMessage, EventType, FrameError, read_from_stream, write_to_stream};
use tokio::net::{TcpListener, TcpStream};

use super::ConnectedClient;
use super::bus::MessageBus;
use super::journal::{JournalError, JournalResult};

impl MessageBus {
    /// Accept loop over an already bound listener
    pub async fn serve(&self, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Message bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Publisher connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// Spawn a new task to handle a publisher connection
    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let bus = self.clone();

        tokio::spawn(async move {
            let client_id = addr.to_string();
            bus.clients.insert(
                client_id.clone(),
                ConnectedClient {
                    id: client_id.clone(),
                    addr: Some(client_id.clone()),
                    connected_at: chrono::Utc::now(),
                },
            );

            if let Err(e) = handle_client_connection(&bus, stream).await {
                tracing::debug!("Publisher {} handler finished: {}", addr, e);
            }

            bus.clients.remove(&client_id);
        });
    }
}

async fn handle_client_connection(bus: &MessageBus, mut stream: TcpStream) -> Result<(), FrameError> {
    let shutdown = bus.shutdown_token().clone();

    loop {
        let mut msg = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            result = read_from_stream(&mut stream) => match result {
                Ok(msg) => msg,
                Err(FrameError::Disconnected) => return Ok(()),
                Err(e) => return Err(e),
            },
        };

        let reply = match msg.event_type {
            EventType::Publish => match publish_blocking(bus, &mut msg).await {
                Ok(sequence) => BusMessage::publish_ack(&msg, sequence)?,
                Err(e) => {
                    tracing::error!(channel = %msg.channel, error = %e, "Failed to journal message");
                    BusMessage::error(&msg, "failed to persist message")?
                }
            },
            other => BusMessage::error(&msg, format!("unexpected event type: {}", other))?,
        };

        write_to_stream(&mut stream, &reply).await?;
    }
}

/// Journal the frame's payload on the blocking pool (durable redb commit)
async fn publish_blocking(bus: &MessageBus, msg: &mut BusMessage) -> JournalResult<u64> {
    let bus = bus.clone();
    let channel = msg.channel.clone();
    let payload = std::mem::take(&mut msg.payload);

    tokio::task::spawn_blocking(move || bus.publish(&channel, &payload))
        .await
        .unwrap_or_else(|e| Err(JournalError::Task(e.to_string())))
}
