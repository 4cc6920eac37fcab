//! Connection hub — one orchestrator, many observers, serialized mutation.
//!
//! All hub state sits behind a single async mutex: updates arrive from one
//! orchestrator connection, broadcasts fan out to many observers, and no
//! observer ever mutates shared state. Persistence is synchronous relative
//! to the update that triggered it; a write failure is logged as an error
//! but never blocks the rebroadcast (availability over durability on the
//! broadcast path).

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

use rostrum_core::{DebateSnapshot, RelayMessage};

use crate::store::DebateStore;

/// Outbound channel to one connected client; the socket task drains it.
pub type ClientTx = mpsc::UnboundedSender<RelayMessage>;

#[derive(Default)]
struct HubInner {
    orchestrator: Option<(u64, ClientTx)>,
    observers: Vec<(u64, ClientTx)>,
    current_id: Option<String>,
    current: Option<DebateSnapshot>,
}

/// The relay hub: registration, persistence, and fan-out.
pub struct RelayHub {
    store: Arc<DebateStore>,
    inner: Mutex<HubInner>,
}

impl RelayHub {
    pub fn new(store: Arc<DebateStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(HubInner::default()),
        }
    }

    /// Handle one message from the client identified by `client_id`,
    /// whose outbound channel is `tx`.
    pub async fn handle_message(&self, client_id: u64, tx: &ClientTx, msg: RelayMessage) {
        let mut inner = self.inner.lock().await;
        match msg {
            RelayMessage::RegisterExtension => {
                info!(client_id, "orchestrator registered");
                inner.orchestrator = Some((client_id, tx.clone()));
            }
            RelayMessage::RegisterDashboard => {
                info!(client_id, "observer registered");
                inner.observers.push((client_id, tx.clone()));
                // A late observer must not wait for the next update to see
                // where things stand.
                if let Some(current) = inner.current.clone() {
                    let _ = tx.send(RelayMessage::StateUpdate(current));
                }
            }
            RelayMessage::DebateUpdate(snapshot) => {
                let id = Self::adopt_id(&mut inner, &snapshot);
                debug!(client_id, debate_id = %id, state = %snapshot.state, "debate update");
                inner.current = Some(snapshot.clone());

                // Synchronous persist so stored and broadcast state match;
                // a failed write is reported but does not stop the fan-out.
                if let Err(e) = self.store.save(&id, &snapshot) {
                    error!(debate_id = %id, error = %e, "failed to persist debate state");
                }

                inner.observers.retain(|(observer_id, observer_tx)| {
                    let open = observer_tx
                        .send(RelayMessage::StateUpdate(snapshot.clone()))
                        .is_ok();
                    if !open {
                        debug!(observer_id, "dropping closed observer");
                    }
                    open
                });
            }
            RelayMessage::ReplayRound(payload) => {
                match &inner.orchestrator {
                    Some((_, orchestrator_tx)) => {
                        // Best-effort forward; delivery is not guaranteed.
                        if orchestrator_tx
                            .send(RelayMessage::ReplayRound(payload))
                            .is_err()
                        {
                            debug!("orchestrator connection closed, dropping replay");
                            inner.orchestrator = None;
                        }
                    }
                    None => debug!("replay requested with no orchestrator attached"),
                }
            }
            RelayMessage::StateUpdate(_) => {
                // Server-outbound only; a client sending it is a protocol
                // violation worth noting, nothing more.
                debug!(client_id, "ignoring client-sent STATE_UPDATE");
            }
        }
    }

    /// Drop all registrations for a disconnected client.
    pub async fn disconnect(&self, client_id: u64) {
        let mut inner = self.inner.lock().await;
        inner.observers.retain(|(id, _)| *id != client_id);
        if inner.orchestrator.as_ref().map(|(id, _)| *id) == Some(client_id) {
            info!(client_id, "orchestrator disconnected");
            inner.orchestrator = None;
        }
    }

    /// Latest known snapshot, if any debate has reported in.
    pub async fn current_state(&self) -> Option<DebateSnapshot> {
        self.inner.lock().await.current.clone()
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.inner.lock().await.observers.len()
    }

    /// Debate id to file the update under: the payload's id when it carries
    /// one, otherwise the previously adopted id, otherwise a synthesized one.
    fn adopt_id(inner: &mut HubInner, snapshot: &DebateSnapshot) -> String {
        let id = if !snapshot.debate_id.is_empty() {
            snapshot.debate_id.clone()
        } else if let Some(id) = &inner.current_id {
            id.clone()
        } else {
            Uuid::new_v4().to_string()
        };
        inner.current_id = Some(id.clone());
        id
    }
}
