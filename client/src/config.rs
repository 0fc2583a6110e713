//! Session configuration.

use crate::error::{ClientError, Result};
use std::time::Duration;
use tether_core::ReconnectPolicy;
use url::Url;

/// Default cadence for fallback polling.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default window after which an unconfirmed optimistic record is
/// considered stale.
pub const DEFAULT_STALE_WINDOW: Duration = Duration::from_secs(30);

/// Everything a [`SyncSession`](crate::SyncSession) needs to reach its
/// backend.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the live channel, e.g. `wss://sync.example.com/ws`
    pub socket_url: String,
    /// Base URL of the REST API, e.g. `https://api.example.com`
    pub api_base: String,
    /// Identity of this client, carried on the channel URL and in
    /// persisted writes
    pub client_id: String,
    /// Bearer token for the REST API and channel handshake, when the
    /// backend requires one
    pub auth_token: Option<String>,
    /// Retry timing for the reconnection controller
    pub reconnect: ReconnectPolicy,
    /// Cadence for fallback polling
    pub poll_interval: Duration,
    /// Give up polling after this many ticks (`None` polls until the
    /// stop condition holds)
    pub max_poll_attempts: Option<u32>,
    /// Age after which a pending optimistic record is reported stale
    pub stale_window: Duration,
}

impl SyncConfig {
    /// Build a config with default timing.
    pub fn new(
        socket_url: impl Into<String>,
        api_base: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            socket_url: socket_url.into(),
            api_base: api_base.into(),
            client_id: client_id.into(),
            auth_token: None,
            reconnect: ReconnectPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: None,
            stale_window: DEFAULT_STALE_WINDOW,
        }
    }

    /// Authenticate against the backend with a bearer token.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Override the reconnect policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Override the fallback polling cadence.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Cap the number of fallback poll ticks.
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = Some(attempts);
        self
    }

    /// Override the stale record window.
    pub fn stale_window(mut self, window: Duration) -> Self {
        self.stale_window = window;
        self
    }

    /// The full channel URL with the client identity (and token, when
    /// set) attached as query parameters.
    pub fn channel_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.socket_url)
            .map_err(|e| ClientError::InvalidConfig(format!("socket url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client-id", &self.client_id);
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}
