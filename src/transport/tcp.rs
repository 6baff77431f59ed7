//! Connection-per-message TCP transport.
//!
//! Every outbound message opens a fresh connection, writes one frame and
//! closes it. The inbound side keeps one listener and serially accepts one
//! connection per message.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::config::{NetConfig, DEFAULT_MAX_FRAME_SIZE};
use crate::protocol::{read_frame, write_frame, Message};
use crate::transport::{MessageSink, MessageSource};

/// Sends each message over its own connection to the peer's acceptor.
pub struct TcpSink {
    peer: String,
    timeout_duration: Option<Duration>,
}

impl TcpSink {
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            timeout_duration: None,
        }
    }

    /// Bound every connect-and-send by `timeout_duration`.
    pub fn with_timeout(peer: impl Into<String>, timeout_duration: Duration) -> Self {
        Self {
            peer: peer.into(),
            timeout_duration: Some(timeout_duration),
        }
    }

    pub fn from_config(config: &NetConfig) -> Self {
        Self {
            peer: config.peer.clone(),
            timeout_duration: config.send_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    async fn send_once(&self, msg: &Message) -> anyhow::Result<()> {
        let mut stream = TcpStream::connect(self.peer.as_str())
            .await
            .with_context(|| format!("connect to {}", self.peer))?;
        write_frame(&mut stream, msg).await?;
        // The peer closes its end once it has read the frame.
        stream.shutdown().await.context("shutdown")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageSink for TcpSink {
    async fn send(&self, msg: Message) -> anyhow::Result<()> {
        match self.timeout_duration {
            None => self.send_once(&msg).await,
            Some(limit) => timeout(limit, self.send_once(&msg))
                .await
                .map_err(|_| anyhow::anyhow!("send timeout after {:?}", limit))?,
        }
    }
}

/// Accepts one connection per inbound message.
pub struct TcpSource {
    listener: TcpListener,
    max_frame_size: u32,
}

impl TcpSource {
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub async fn bind<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("bind acceptor")?;
        Ok(Self::new(listener))
    }

    pub async fn from_config(config: &NetConfig) -> anyhow::Result<Self> {
        let mut source = Self::bind(config.listen.as_str()).await?;
        source.max_frame_size = config.max_frame_size;
        Ok(source)
    }

    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait::async_trait]
impl MessageSource for TcpSource {
    async fn recv(&mut self) -> anyhow::Result<Option<Message>> {
        let (mut stream, addr) = self.listener.accept().await.context("accept")?;
        let msg = read_frame(&mut stream, self.max_frame_size)
            .await
            .with_context(|| format!("message from {}", addr))?;
        log::debug!("received {:?} from {}", msg, addr);
        Ok(Some(msg))
    }
}
