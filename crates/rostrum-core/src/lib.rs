//! Rostrum core — multi-LLM debate orchestration.
//!
//! Coordinates a fixed three-round debate between independent text
//! participants (debater, critic, researcher) plus an arbitrating
//! orchestrator, degrading into a human-assisted fallback whenever an
//! automated step fails.
//!
//! # Debate flow
//!
//! ```text
//! Idle → Round1Send → Round1Evaluate → Round2Send → ... → Round3Evaluate → Done
//!              │              │
//!              └──────────────┴── any failure → AssistedWait
//!                                   (human supplies a substitute, resume)
//! ```
//!
//! The crate splits along the seams of the system:
//! - [`compiler`] / [`prompts`] — prompt construction and evaluation
//!   extraction (the `BEGIN_DEBATE_JSON` / `END_DEBATE_JSON` contract).
//! - [`gateway`] — delivery boundary to the external UI-automation
//!   collaborator.
//! - [`machine`] / [`session`] — the orchestration state machine and its
//!   owned session aggregate.
//! - [`protocol`] / [`relay`] — the relay wire protocol and the
//!   orchestrator-side publishing client.

pub mod compiler;
pub mod document;
pub mod gateway;
pub mod machine;
pub mod prompts;
pub mod protocol;
pub mod relay;
pub mod role;
pub mod session;

pub use compiler::{extract_evaluation, format_evaluation, ExtractError};
pub use document::{DebatePacket, EvaluationDocument, ParticipantScore, Synthesis};
pub use gateway::{DispatchError, DispatchGateway, GatewayConfig, HttpGateway};
pub use machine::{DebateMachine, MachineError, NullSink, StatusSink};
pub use protocol::RelayMessage;
pub use relay::RelayClient;
pub use role::{ParticipantRole, DEBATE_ROLES};
pub use session::{
    Debate, DebateSession, DebateSnapshot, MachineState, PendingAssist, ResponseRecord, Round,
    MAX_ROUNDS,
};
