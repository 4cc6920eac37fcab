//! Debate session state — rounds, machine states, and pending assistance.
//!
//! One `DebateSession` aggregate owns everything mutable about a running
//! debate. Completed rounds are immutable history; round numbering never
//! regresses; a pending assist exists exactly while the machine is in
//! `Assisted`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{EvaluationDocument, Synthesis};
use crate::role::ParticipantRole;

/// Fixed number of debate rounds.
pub const MAX_ROUNDS: u8 = 3;

/// State of the debate machine.
///
/// Serialized as the wire string the dashboard expects
/// (`IDLE`, `ROUND_2_SEND`, `ASSISTED_WAIT`, `DONE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// No debate running.
    Idle,
    /// Dispatching round `n` to the three debating roles.
    RoundSend(u8),
    /// Awaiting or processing the orchestrator's evaluation of round `n`.
    RoundEvaluate(u8),
    /// An automated step failed; execution suspended on a pending assist.
    Assisted,
    /// Terminal: three rounds evaluated, synthesis recorded.
    Done,
}

impl MachineState {
    /// Whether a debate is in progress (anything between start and `Done`).
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Done)
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::RoundSend(n) => write!(f, "ROUND_{}_SEND", n),
            Self::RoundEvaluate(n) => write!(f, "ROUND_{}_EVALUATE", n),
            Self::Assisted => write!(f, "ASSISTED_WAIT"),
            Self::Done => write!(f, "DONE"),
        }
    }
}

impl std::str::FromStr for MachineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => return Ok(Self::Idle),
            "ASSISTED_WAIT" => return Ok(Self::Assisted),
            "DONE" => return Ok(Self::Done),
            _ => {}
        }
        let rest = s
            .strip_prefix("ROUND_")
            .ok_or_else(|| format!("unknown machine state: {}", s))?;
        if let Some(n) = rest.strip_suffix("_SEND") {
            return n
                .parse()
                .map(Self::RoundSend)
                .map_err(|_| format!("bad round number in state: {}", s));
        }
        if let Some(n) = rest.strip_suffix("_EVALUATE") {
            return n
                .parse()
                .map(Self::RoundEvaluate)
                .map_err(|_| format!("bad round number in state: {}", s));
        }
        Err(format!("unknown machine state: {}", s))
    }
}

impl Serialize for MachineState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MachineState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The one step awaiting a human substitute while the machine is `Assisted`.
///
/// A tagged variant with minimal resumption context (round, original prompt)
/// rather than a stored continuation, so it serializes into snapshots and
/// survives inspection across a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingAssist {
    /// A participant dispatch failed; the human supplies that participant's
    /// response to the carried prompt.
    ParticipantSend {
        round: u8,
        role: ParticipantRole,
        prompt: String,
    },
    /// Delivery to the orchestrator failed; the human supplies the
    /// orchestrator's reply to the carried prompt.
    OrchestratorSend { round: u8, prompt: String },
    /// The orchestrator's reply did not parse; the prompt carried is the
    /// *original request*, so a human can regenerate a compliant reply.
    OrchestratorParse { round: u8, prompt: String },
}

impl PendingAssist {
    /// Wire label of the assist kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParticipantSend { .. } => "PARTICIPANT_SEND",
            Self::OrchestratorSend { .. } => "ORCHESTRATOR_SEND",
            Self::OrchestratorParse { .. } => "ORCHESTRATOR_PARSE",
        }
    }

    /// Round the suspended step belongs to.
    pub fn round(&self) -> u8 {
        match self {
            Self::ParticipantSend { round, .. }
            | Self::OrchestratorSend { round, .. }
            | Self::OrchestratorParse { round, .. } => *round,
        }
    }

    /// The literal text a human should act on.
    pub fn prompt(&self) -> &str {
        match self {
            Self::ParticipantSend { prompt, .. }
            | Self::OrchestratorSend { prompt, .. }
            | Self::OrchestratorParse { prompt, .. } => prompt,
        }
    }
}

/// The literal text a participant returned for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// One debate round: three responses plus the orchestrator's evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-indexed round number.
    pub number: u8,
    /// Response per debating role. Empty until the round's dispatch joins
    /// successfully — a failed round stores nothing.
    pub responses: BTreeMap<ParticipantRole, ResponseRecord>,
    /// Set once evaluation succeeds; the round is immutable afterwards.
    pub evaluation: Option<EvaluationDocument>,
}

impl Round {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            responses: BTreeMap::new(),
            evaluation: None,
        }
    }

    /// Whether all three responses and the evaluation are present.
    pub fn is_complete(&self) -> bool {
        self.responses.len() == 3 && self.evaluation.is_some()
    }
}

/// A debate: identity, topic, and accumulated history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debate {
    pub id: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub rounds: Vec<Round>,
    /// Copied from the final round's evaluation when the debate completes.
    pub synthesis: Option<Synthesis>,
}

impl Debate {
    pub fn new(topic: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            created_at: Utc::now(),
            rounds: Vec::new(),
            synthesis: None,
        }
    }
}

/// The owned aggregate for one running debate: debate history, machine
/// state, and at most one pending assist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub debate: Debate,
    pub state: MachineState,
    pub pending: Option<PendingAssist>,
    /// Last human-readable status line, mirrored into every snapshot.
    pub status: String,
}

impl DebateSession {
    pub fn new(topic: &str) -> Self {
        Self {
            debate: Debate::new(topic),
            state: MachineState::Idle,
            pending: None,
            status: "Created".to_string(),
        }
    }

    /// The round record for `number`, created on first access. Rounds are
    /// only ever created in sequence by the machine.
    pub fn round_mut(&mut self, number: u8) -> &mut Round {
        if self.debate.rounds.last().map(|r| r.number) != Some(number) {
            self.debate.rounds.push(Round::new(number));
        }
        self.debate
            .rounds
            .last_mut()
            .expect("round just ensured")
    }

    /// The stored round record for `number`, if any.
    pub fn round(&self, number: u8) -> Option<&Round> {
        self.debate.rounds.iter().find(|r| r.number == number)
    }

    /// The evaluation document of the round before `number`.
    pub fn previous_evaluation(&self, number: u8) -> Option<&EvaluationDocument> {
        if number <= 1 {
            return None;
        }
        self.round(number - 1).and_then(|r| r.evaluation.as_ref())
    }

    /// Suspend on a pending assist. Only one can exist at a time.
    pub fn enter_assisted(&mut self, pending: PendingAssist) {
        debug_assert!(self.pending.is_none(), "pending assist already present");
        self.pending = Some(pending);
        self.state = MachineState::Assisted;
    }

    /// Clear and return the pending assist, leaving `Assisted`.
    pub fn take_pending(&mut self) -> Option<PendingAssist> {
        self.pending.take()
    }

    /// Full serializable snapshot of the session.
    pub fn snapshot(&self) -> DebateSnapshot {
        DebateSnapshot {
            debate_id: self.debate.id.clone(),
            topic: self.debate.topic.clone(),
            created_at: self.debate.created_at,
            state: self.state,
            status: self.status.clone(),
            rounds: self.debate.rounds.clone(),
            synthesis: self.debate.synthesis.clone(),
            pending: self.pending.clone(),
        }
    }
}

/// The full debate state pushed to the relay on every transition, and the
/// shape the relay persists and rebroadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSnapshot {
    pub debate_id: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub state: MachineState,
    pub status: String,
    pub rounds: Vec<Round>,
    pub synthesis: Option<Synthesis>,
    pub pending: Option<PendingAssist>,
}
