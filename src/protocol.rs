//! Peer-to-peer wire messages and their framing.
//!
//! Each connection carries exactly one frame: a 4-byte big-endian payload
//! length followed by the bincode encoding of a [`Message`] (a `u32` variant
//! tag, then zero or two `i32` coordinates).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Messages exchanged between the two peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// All of the sender's ships are placed.
    Ready,
    /// The sender fired at (x, y) of the receiver's field.
    Seen { x: i32, y: i32 },
    /// The receiver's shot at (x, y) hit one of the sender's ships.
    ShipDiscovered { x: i32, y: i32 },
}

/// Serialize `msg` into a length-prefixed frame.
pub fn encode_frame(msg: &Message) -> anyhow::Result<Vec<u8>> {
    let payload = bincode::serialize(msg).context("serialization error")?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a frame produced by [`encode_frame`]. The whole buffer must be
/// exactly one frame.
pub fn decode_frame(frame: &[u8], max_size: u32) -> anyhow::Result<Message> {
    if frame.len() < 4 {
        anyhow::bail!("truncated frame header: {} bytes", frame.len());
    }
    let (header, payload) = frame.split_at(4);
    let len = check_length(header, max_size)?;
    if payload.len() != len as usize {
        anyhow::bail!(
            "frame length mismatch: header says {}, got {}",
            len,
            payload.len()
        );
    }
    decode_payload(payload)
}

/// Write one frame to `writer` and flush it.
pub async fn write_frame<W>(writer: &mut W, msg: &Message) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(msg)?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| io_error("write", e))?;
    writer.flush().await.map_err(|e| io_error("write", e))?;
    Ok(())
}

/// Read exactly one frame from `reader`.
pub async fn read_frame<R>(reader: &mut R, max_size: u32) -> anyhow::Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| io_error("read", e))?;
    let len = check_length(&header, max_size)?;
    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| io_error("read", e))?;
    decode_payload(&payload)
}

fn check_length(header: &[u8], max_size: u32) -> anyhow::Result<u32> {
    let bytes: [u8; 4] = header.try_into().context("frame header must be 4 bytes")?;
    let len = u32::from_be_bytes(bytes);
    if len == 0 {
        anyhow::bail!("invalid message length: 0");
    }
    if len > max_size {
        anyhow::bail!("message too large: {} bytes (max: {})", len, max_size);
    }
    Ok(len)
}

fn decode_payload(payload: &[u8]) -> anyhow::Result<Message> {
    bincode::deserialize(payload).context("deserialization error")
}

fn io_error(op: &str, e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => anyhow::anyhow!("connection closed by peer"),
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            anyhow::anyhow!("connection reset by peer")
        }
        _ => anyhow::anyhow!("{} error: {}", op, e),
    }
}
