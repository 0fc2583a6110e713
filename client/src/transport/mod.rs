//! Transport abstraction for the live channel.
//!
//! The session only ever talks to [`Transport`] and [`Channel`], so the
//! concrete wire technology (WebSocket today) is swappable without
//! touching reconnection, reconciliation, or the outbox. The
//! [`NullTransport`] covers deployments with no push channel at all,
//! where the session runs purely on fallback polling.

mod null;
mod ws;

pub use null::NullTransport;
pub use ws::WsTransport;

use crate::error::Result;
use async_trait::async_trait;

/// Lifecycle of the live channel as observed by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel and no attempt in flight
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// The channel is open
    Connected,
    /// The channel dropped; waiting out the retry delay
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

/// Something the channel reported.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A text frame arrived
    Message(String),
    /// The peer closed the channel
    Closed { code: Option<u16>, reason: String },
    /// The channel failed
    Error(String),
}

/// An open bidirectional channel.
#[async_trait]
pub trait Channel: Send {
    /// Send one text frame.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Wait for the next event. `None` means the channel is gone.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Close the channel. Always called before a new connect.
    async fn close(&mut self);
}

/// A factory for channels. One `connect` call per attempt; the session
/// never holds two channels at once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Channel>>;
}
