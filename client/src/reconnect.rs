//! Reconnection controller.
//!
//! Owns the [`ConnectionState`] and the retry timing. The connection
//! task is the only writer; any number of consumers can watch the state
//! through [`ReconnectController::subscribe`]. Attempts are strictly
//! sequential because a single task drives the whole connect loop.

use crate::transport::ConnectionState;
use std::time::Duration;
use tether_core::ReconnectPolicy;
use tokio::sync::watch;

pub struct ReconnectController {
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
}

impl ReconnectController {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { policy, state_tx }
    }

    /// Watch connection state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = %current, to = %state, "connection state");
            *current = state;
            true
        });
    }

    /// Delay before the next attempt, with jitter applied.
    pub(crate) fn next_delay(&self) -> Duration {
        self.policy.next_delay(rand::random::<f64>())
    }
}
