//! In-process transport pair.
//!
//! Messages travel as encoded frames so both ends exercise the same codec as
//! the TCP transport.

use tokio::sync::mpsc;

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::protocol::{decode_frame, encode_frame, Message};
use crate::transport::{MessageSink, MessageSource};

pub struct InMemorySink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

pub struct InMemorySource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// One direction: what goes into the sink comes out of the source.
pub fn channel() -> (InMemorySink, InMemorySource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InMemorySink { tx }, InMemorySource { rx })
}

/// Two connected endpoints, each with a sink to the other and its own source.
pub fn pair() -> (
    (InMemorySink, InMemorySource),
    (InMemorySink, InMemorySource),
) {
    let (a_sink, b_source) = channel();
    let (b_sink, a_source) = channel();
    ((a_sink, a_source), (b_sink, b_source))
}

impl InMemorySink {
    /// Push raw bytes as if they had arrived on a connection.
    pub fn send_raw(&self, frame: Vec<u8>) -> anyhow::Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| anyhow::anyhow!("channel closed"))
    }
}

#[async_trait::async_trait]
impl MessageSink for InMemorySink {
    async fn send(&self, msg: Message) -> anyhow::Result<()> {
        self.send_raw(encode_frame(&msg)?)
    }
}

#[async_trait::async_trait]
impl MessageSource for InMemorySource {
    async fn recv(&mut self) -> anyhow::Result<Option<Message>> {
        match self.rx.recv().await {
            Some(frame) => decode_frame(&frame, DEFAULT_MAX_FRAME_SIZE).map(Some),
            None => Ok(None),
        }
    }
}
