//! Relay wire protocol — JSON `{type, payload}` messages over WebSocket.
//!
//! Shared by the orchestrator-side client and the relay service. The
//! orchestrator registers with `REGISTER_EXTENSION` and pushes full
//! `DEBATE_UPDATE` snapshots; observers register with `REGISTER_DASHBOARD`
//! and receive `STATE_UPDATE` rebroadcasts. `REPLAY_ROUND` travels
//! observer → relay → orchestrator with an opaque payload.

use serde::{Deserialize, Serialize};

use crate::session::DebateSnapshot;

/// A relay wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayMessage {
    /// Orchestrator identifies itself; at most one per relay.
    RegisterExtension,
    /// Observer identifies itself; triggers an immediate state replay.
    RegisterDashboard,
    /// Orchestrator → relay: the full current debate snapshot.
    DebateUpdate(DebateSnapshot),
    /// Relay → observer: rebroadcast of the current snapshot.
    StateUpdate(DebateSnapshot),
    /// Observer → relay → orchestrator, forwarded verbatim. Best-effort:
    /// dropped when no orchestrator connection is attached.
    ReplayRound(serde_json::Value),
}

impl RelayMessage {
    /// Serialize for a WebSocket text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a WebSocket text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
