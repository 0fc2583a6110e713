//! Tether client - the runtime half of the sync stack.
//!
//! [`tether_core`] holds the pure state machinery (store, outbox,
//! reconciliation); this crate supplies everything that touches the
//! outside world:
//!
//! - **Transport adapter** ([`transport`]): the live channel behind a
//!   trait, with WebSocket and null implementations.
//! - **Reconnection controller** ([`reconnect`]): connection state plus
//!   retry timing with jitter.
//! - **Fallback poller** ([`poller`]): interval fetching with a stop
//!   condition, for state the channel does not push.
//! - **Authoritative source** ([`api`]): the REST client behind the
//!   [`RemoteSource`] trait.
//! - **Sync session** ([`session`]): the orchestrator tying the above
//!   to a [`tether_core::OptimisticStore`].
//!
//! # Quick Start
//!
//! ```no_run
//! use tether_client::{SyncConfig, SyncSession};
//!
//! # async fn run() -> tether_client::Result<()> {
//! let config = SyncConfig::new(
//!     "wss://sync.example.com/ws",
//!     "https://api.example.com",
//!     "client-42",
//! );
//! let mut session = SyncSession::over_websocket(config)?;
//! session.start().await;
//!
//! let id = session.send_text("admin", "hello");
//! println!("optimistic record: {id}");
//!
//! session.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use api::{ApiClient, Plan, RemoteSource};
pub use config::SyncConfig;
pub use error::{ClientError, Result};
pub use poller::{FallbackPoller, PollTarget};
pub use reconnect::ReconnectController;
pub use session::{SessionEvent, SyncSession};
pub use transport::{
    Channel, ConnectionState, NullTransport, Transport, TransportEvent, WsTransport,
};

// Re-export the pure layer so consumers need only one dependency.
pub use tether_core as core;
