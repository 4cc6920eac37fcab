//! HTTP surface of the relay: WebSocket endpoint plus a small read-only
//! REST API over the persisted debates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use rostrum_core::RelayMessage;

use crate::hub::RelayHub;
use crate::store::{DebateStore, StoreError};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RelayHub>,
    pub store: Arc<DebateStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/debates", get(list_debates))
        .route("/debates/{id}", get(get_debate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "relay listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn list_debates(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list() {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to list debates");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_debate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.load(&id) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(StoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(debate_id = %id, error = %e, "failed to load debate");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    info!(client_id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RelayMessage>();

    // Writer task: drain hub-originated messages onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match msg.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to encode outbound message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader loop: every text frame goes through the hub.
    while let Some(frame) = ws_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(client_id, error = %e, "websocket read error");
                break;
            }
        };
        match frame {
            Message::Text(text) => match RelayMessage::from_json(&text) {
                Ok(msg) => state.hub.handle_message(client_id, &tx, msg).await,
                Err(e) => warn!(client_id, error = %e, "unparseable relay frame"),
            },
            Message::Close(_) => break,
            // Axum answers pings itself; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    state.hub.disconnect(client_id).await;
    drop(tx);
    writer.abort();
    info!(client_id, "websocket disconnected");
}
