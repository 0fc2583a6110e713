//! WebSocket transport backed by tokio-tungstenite.

use crate::error::{ClientError, Result};
use crate::transport::{Channel, Transport, TransportEvent};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

/// Connects to a WebSocket endpoint.
pub struct WsTransport {
    url: Url,
}

impl WsTransport {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> Result<Box<dyn Channel>> {
        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        tracing::debug!(url = %self.url, "websocket handshake complete");
        Ok(Box::new(WsChannel { inner: stream }))
    }
}

struct WsChannel {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.inner
            .send(Message::text(text))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        while let Some(item) = self.inner.next().await {
            match item {
                Ok(Message::Text(text)) => {
                    return Some(TransportEvent::Message(text.to_string()));
                }
                Ok(Message::Close(frame)) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code));
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    return Some(TransportEvent::Closed { code, reason });
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!("ignoring binary frame");
                }
                // Pings are answered by tungstenite itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(TransportEvent::Error(e.to_string())),
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close(None).await {
            tracing::debug!(error = %e, "close handshake failed");
        }
    }
}
