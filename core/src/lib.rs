//! # Tether Core
//!
//! Deterministic primitives for a reliable live-sync client.
//!
//! A live-sync client maintains a locally-rendered view of server-owned
//! state over an unreliable push channel. This crate holds everything
//! that can be expressed without IO, so the runtime layer
//! (`tether-client`) stays a thin wiring of transports and timers:
//!
//! - [`SyncMessage`] - the validated push envelope. Raw channel payloads
//!   are parsed and shape-checked here, at the boundary, so malformed
//!   data never reaches the store.
//! - [`OptimisticStore`] - the locally-rendered view. Local mutations
//!   are applied optimistically and later reconciled against
//!   authoritative pushes or polls. Confirmed contents are a cache of
//!   server truth, never the reverse.
//! - [`Outbox`] - FIFO queue of actions issued while the channel was
//!   down, drained exactly once after the next successful reconnect.
//! - [`ReconnectPolicy`] - retry delay arithmetic for the reconnection
//!   controller.
//!
//! ## Design Principles
//!
//! - **No IO**: no sockets, timers, or clocks; callers pass timestamps in
//! - **Deterministic**: same inputs always produce the same store state
//! - **Tolerant**: duplicate, reordered, or malformed pushes never
//!   corrupt the session - at worst a message is dropped and reported
//!
//! ## Quick Start
//!
//! ```rust
//! use tether_core::{ChatEntry, OptimisticStore, Origin, SyncMessage};
//!
//! let mut store = OptimisticStore::new();
//!
//! // Seed with authoritative history.
//! store.seed(vec![ChatEntry::new("support", "hi", 1000)]);
//!
//! // A local send appears immediately.
//! let local_id = store.apply_optimistic(ChatEntry::new("admin", "hello back", 2000));
//! assert_eq!(store.snapshot().len(), 2);
//! assert_eq!(store.snapshot()[1].origin, Origin::Optimistic);
//!
//! // The server push confirms it.
//! let push = SyncMessage::parse(
//!     r#"{"type":"chatUpdated","message":{"sender":"admin","content":"hello back","timestamp":2000}}"#,
//! ).unwrap();
//! store.reconcile(&push);
//! assert_eq!(store.snapshot()[1].origin, Origin::Confirmed);
//! assert_eq!(store.get(&local_id).unwrap().origin, Origin::Confirmed);
//! ```

pub mod error;
pub mod message;
pub mod outbox;
pub mod policy;
pub mod record;
pub mod store;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use message::{ChatEntry, MessageKind, SyncMessage};
pub use outbox::{Outbox, QueuedSend};
pub use policy::ReconnectPolicy;
pub use record::{LocalId, LocalRecord, Origin};
pub use store::{OptimisticStore, ReconcileOutcome};

/// Type aliases for clarity
pub type Timestamp = u64;
