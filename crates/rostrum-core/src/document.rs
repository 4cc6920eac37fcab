//! Evaluation documents — the orchestrator's structured verdict for a round.
//!
//! The orchestrator replies in free text but must embed a strict JSON block:
//! per-participant scores and feedback, a next-round packet per participant,
//! and a running synthesis. Absence or a malformed shape is a failure, never
//! a missing value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::role::{ParticipantRole, DEBATE_ROLES};

/// Maximum score the orchestrator may award.
pub const MAX_SCORE: u8 = 5;

/// Score and feedback for one participant in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantScore {
    /// 0–5, inclusive.
    pub score: u8,
    /// Free-text feedback for the participant.
    pub feedback: String,
}

/// Next-round instructions authored by the orchestrator for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebatePacket {
    /// Role label as the orchestrator phrased it (e.g. "Critic").
    pub role: String,
    /// Instructions for the next round.
    pub instructions: String,
    /// Ordered context bullets carried into the next prompt.
    pub context_bullets: Vec<String>,
}

/// The orchestrator's running synthesis of the debate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    /// Where the participants currently agree.
    pub current_consensus: String,
    /// The live points of contention.
    pub major_disagreements: String,
}

/// The complete structured result of one round's evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDocument {
    /// Round this document evaluates (1–3).
    pub round: u8,
    /// Score per debating role. All three roles required.
    pub scores: BTreeMap<ParticipantRole, ParticipantScore>,
    /// Next-round packet per debating role. All three roles required.
    pub packets: BTreeMap<ParticipantRole, DebatePacket>,
    /// Running synthesis.
    pub synthesis: Synthesis,
}

impl EvaluationDocument {
    /// Check the strict shape requirements that the JSON schema alone cannot
    /// express: every debating role scored and packeted, scores in range.
    pub fn validate(&self) -> Result<(), String> {
        for role in DEBATE_ROLES {
            let score = self
                .scores
                .get(&role)
                .ok_or_else(|| format!("missing score for {}", role))?;
            if score.score > MAX_SCORE {
                return Err(format!(
                    "score {} for {} exceeds maximum {}",
                    score.score, role, MAX_SCORE
                ));
            }
            if !self.packets.contains_key(&role) {
                return Err(format!("missing packet for {}", role));
            }
        }
        Ok(())
    }

    /// Packet for a role, if the orchestrator supplied one.
    pub fn packet(&self, role: ParticipantRole) -> Option<&DebatePacket> {
        self.packets.get(&role)
    }
}

/// Fully-populated document used across the crate's tests.
#[cfg(test)]
pub(crate) fn sample_document(round: u8) -> EvaluationDocument {
    let mut scores = BTreeMap::new();
    let mut packets = BTreeMap::new();
    for role in DEBATE_ROLES {
        scores.insert(
            role,
            ParticipantScore {
                score: 4,
                feedback: format!("solid round from {}", role),
            },
        );
        packets.insert(
            role,
            DebatePacket {
                role: role.label().to_string(),
                instructions: format!("press harder on costs, {}", role),
                context_bullets: vec!["adoption is accelerating".to_string()],
            },
        );
    }
    EvaluationDocument {
        round,
        scores,
        packets,
        synthesis: Synthesis {
            current_consensus: "openness helps research".to_string(),
            major_disagreements: "safety of frontier weights".to_string(),
        },
    }
}
