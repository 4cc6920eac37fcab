//! Orchestrator-side relay client — best-effort snapshot publication.
//!
//! Connects lazily, registers as the orchestrator connection, and pushes one
//! `DEBATE_UPDATE` per machine transition. A dead connection is dropped and
//! re-dialed on the next publish; an unreachable relay never blocks or fails
//! the debate (the machine logs the error and moves on).

use async_trait::async_trait;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::machine::StatusSink;
use crate::protocol::RelayMessage;
use crate::session::DebateSnapshot;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client publishing debate snapshots to the relay service.
pub struct RelayClient {
    url: String,
    conn: Mutex<Option<WsStream>>,
}

impl RelayClient {
    /// Create a client for `url` (e.g. `ws://127.0.0.1:3000/ws`). No
    /// connection is opened until the first publish.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            conn: Mutex::new(None),
        }
    }

    async fn connect(&self) -> anyhow::Result<WsStream> {
        let (mut stream, _) = connect_async(&self.url).await?;
        stream
            .send(Message::text(RelayMessage::RegisterExtension.to_json()?))
            .await?;
        info!(url = %self.url, "registered with relay");
        Ok(stream)
    }
}

#[async_trait]
impl StatusSink for RelayClient {
    async fn publish(&self, snapshot: DebateSnapshot) -> anyhow::Result<()> {
        let frame = RelayMessage::DebateUpdate(snapshot).to_json()?;
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let stream = guard.as_mut().expect("connection just established");
        if let Err(e) = stream.send(Message::text(frame)).await {
            // Drop the broken connection; the next publish re-dials.
            debug!(error = %e, "relay send failed, dropping connection");
            *guard = None;
            return Err(e.into());
        }
        Ok(())
    }
}
