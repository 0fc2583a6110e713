//! Push-less transport for polling-only deployments.

use crate::error::Result;
use crate::transport::{Channel, Transport, TransportEvent};
use async_trait::async_trait;

/// A transport with no push channel. `connect` succeeds immediately and
/// the resulting channel never produces events, so a session built on
/// it receives updates only through fallback polling and seed fetches.
pub struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn connect(&self) -> Result<Box<dyn Channel>> {
        Ok(Box::new(NullChannel))
    }
}

struct NullChannel;

#[async_trait]
impl Channel for NullChannel {
    async fn send(&mut self, _text: &str) -> Result<()> {
        // Writes reach the backend through the REST persist path; the
        // live-channel copy has nowhere to go.
        tracing::debug!("no push channel; frame dropped");
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        futures::future::pending().await
    }

    async fn close(&mut self) {}
}
