//! Participant roles — the closed set of seats at the debate table.

use serde::{Deserialize, Serialize};

/// Role of a participant in the debate.
///
/// Three roles debate; the orchestrator scores them and authors the next
/// round's packets. Each role is bound to exactly one external endpoint by
/// the dispatch gateway — the binding itself is operator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// Arbitrates: scores each round and writes the next debate packets.
    Orchestrator,
    /// Argues for the motion.
    Debater,
    /// Challenges premises and arguments.
    Critic,
    /// Supplies background context and trends.
    Researcher,
}

/// The three debating roles, in dispatch order. Excludes the orchestrator.
pub const DEBATE_ROLES: [ParticipantRole; 3] = [
    ParticipantRole::Debater,
    ParticipantRole::Critic,
    ParticipantRole::Researcher,
];

impl ParticipantRole {
    /// Snake-case name, matching the serialized form and the keys used in
    /// evaluation documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Debater => "debater",
            Self::Critic => "critic",
            Self::Researcher => "researcher",
        }
    }

    /// Upper-case label used in prompt text and named response slots.
    pub fn label(self) -> &'static str {
        match self {
            Self::Orchestrator => "ORCHESTRATOR",
            Self::Debater => "DEBATER",
            Self::Critic => "CRITIC",
            Self::Researcher => "RESEARCHER",
        }
    }

}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
