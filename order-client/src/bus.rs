//! Bus publisher client
//!
//! One request in flight at a time: `publish` writes a frame and waits for the
//! reply carrying the same `request_id`.

use shared::message::{BusMessage, ErrorPayload, EventType, PublishAck, read_from_stream, write_to_stream};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{ClientError, ClientResult};

/// Publisher connection to the bus TCP ingress
#[derive(Debug)]
pub struct BusClient {
    stream: TcpStream,
}

impl BusClient {
    /// Connect to the bus ingress
    pub async fn connect(addr: impl ToSocketAddrs) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Publish `payload` on `channel`
    ///
    /// Returns the sequence number assigned by the bus. When this returns the
    /// message is durable on the server side.
    pub async fn publish(&mut self, channel: &str, payload: Vec<u8>) -> ClientResult<u64> {
        let request = BusMessage::publish(channel, payload);
        write_to_stream(&mut self.stream, &request).await?;

        let reply = read_from_stream(&mut self.stream).await?;
        if reply.request_id != request.request_id {
            return Err(ClientError::InvalidResponse(format!(
                "reply for request {} while waiting for {}",
                reply.request_id, request.request_id
            )));
        }

        match reply.event_type {
            EventType::PublishAck => {
                let ack: PublishAck = reply.parse_payload()?;
                tracing::debug!(channel, sequence = ack.sequence, "Publish acknowledged");
                Ok(ack.sequence)
            }
            EventType::Error => {
                let err: ErrorPayload = reply.parse_payload()?;
                Err(ClientError::Rejected(err.message))
            }
            other => Err(ClientError::InvalidResponse(format!(
                "unexpected reply type: {}",
                other
            ))),
        }
    }
}
