//! Relay and persistence service for rostrum debates.
//!
//! The orchestrator side connects over WebSocket and pushes a full debate
//! snapshot on every state transition. The relay persists each snapshot to
//! disk, rebroadcasts it to any number of observer connections, and serves
//! a read-only REST view of everything it has stored. Observer commands
//! (currently round replay) travel the other way, forwarded verbatim to
//! the orchestrator connection.

pub mod hub;
pub mod server;
pub mod store;

pub use hub::RelayHub;
pub use server::{serve, AppState};
pub use store::{DebateStore, DebateSummary, StoreError};
