mod board;
mod cell;
mod common;
mod config;
mod event;
mod game;
mod logging;
pub mod peer;
pub mod protocol;
mod session;
mod ship;
pub mod transport;
pub mod ui;

pub use board::*;
pub use cell::*;
pub use common::*;
pub use config::*;
pub use event::*;
pub use game::*;
pub use logging::init_logging;
pub use peer::{PeerHandle, PeerProtocol, SessionSignal};
pub use protocol::Message;
pub use session::*;
pub use ship::*;
pub use transport::in_memory::{InMemorySink, InMemorySource};
pub use transport::tcp::{TcpSink, TcpSource};
pub use transport::{MessageSink, MessageSource};
