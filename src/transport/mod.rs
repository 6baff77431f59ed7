//! Message transports.
//!
//! The peer protocol only needs somewhere to send a [`Message`] and somewhere
//! to receive the next one; how connections are made is up to the
//! implementation.

use crate::protocol::Message;

/// Outbound half: delivers one message to the peer.
#[async_trait::async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, msg: Message) -> anyhow::Result<()>;
}

/// Inbound half: waits for the next message from the peer.
#[async_trait::async_trait]
pub trait MessageSource: Send {
    /// Next message, or `Ok(None)` once the peer can no longer send.
    async fn recv(&mut self) -> anyhow::Result<Option<Message>>;
}

pub mod in_memory;
pub mod tcp;
