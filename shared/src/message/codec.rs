//! 帧编码
//!
//! ```text
//! ┌──────┬────────────┬─────────┬─────────┬─────────┬─────────┐
//! │ type │ request_id │ ch_len  │ channel │ len     │ payload │
//! │ 1 B  │ 16 B       │ u16 LE  │ UTF-8   │ u32 LE  │ bytes   │
//! └──────┴────────────┴─────────┴─────────┴─────────┴─────────┘
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use super::{BusMessage, EventType, FrameError};

/// Largest payload accepted on the wire (16 MiB)
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// 从异步流中读取 BusMessage
pub async fn read_from_stream<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, FrameError> {
    // 读取事件类型 (1 字节)
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::Disconnected);
        }
        Err(e) => return Err(e.into()),
    }
    let event_type = EventType::try_from(type_buf[0])?;

    // 读取 Request ID (16 字节)
    let mut uuid_buf = [0u8; 16];
    reader.read_exact(&mut uuid_buf).await?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // 读取频道名
    let mut ch_len_buf = [0u8; 2];
    reader.read_exact(&mut ch_len_buf).await?;
    let mut channel_buf = vec![0u8; u16::from_le_bytes(ch_len_buf) as usize];
    reader.read_exact(&mut channel_buf).await?;
    let channel = String::from_utf8(channel_buf).map_err(|_| FrameError::InvalidChannel)?;

    // 读取载荷长度 (4 字节)
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge(len));
    }

    // 读取载荷内容
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(BusMessage {
        request_id,
        event_type,
        channel,
        payload,
    })
}

/// 向异步流写入 BusMessage
pub async fn write_to_stream<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), FrameError> {
    if msg.payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge(msg.payload.len()));
    }
    let channel_len = u16::try_from(msg.channel.len()).map_err(|_| FrameError::InvalidChannel)?;

    let mut data = Vec::with_capacity(1 + 16 + 2 + msg.channel.len() + 4 + msg.payload.len());
    data.push(msg.event_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());
    data.extend_from_slice(&channel_len.to_le_bytes());
    data.extend_from_slice(msg.channel.as_bytes());
    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_survive_a_stream() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let first = BusMessage::publish("orders", br#"{"order_uid":"o1"}"#.to_vec());
        let second = BusMessage::publish("orders", Vec::new());
        write_to_stream(&mut client, &first).await.unwrap();
        write_to_stream(&mut client, &second).await.unwrap();

        assert_eq!(read_from_stream(&mut server).await.unwrap(), first);
        assert_eq!(read_from_stream(&mut server).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_closed_stream_reports_disconnect() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let err = read_from_stream(&mut server).await.unwrap_err();
        assert!(matches!(err, FrameError::Disconnected));
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        let mut frame = vec![EventType::Publish as u8];
        frame.extend_from_slice(Uuid::new_v4().as_bytes());
        frame.extend_from_slice(&0u16.to_le_bytes());
        frame.extend_from_slice(&u32::MAX.to_le_bytes());
        client.write_all(&frame).await.unwrap();

        let err = read_from_stream(&mut server).await.unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0xFF]).await.unwrap();

        let err = read_from_stream(&mut server).await.unwrap_err();
        assert!(matches!(err, FrameError::InvalidEventType(0xFF)));
    }
}
