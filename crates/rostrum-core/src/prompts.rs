//! Canonical prompt texts and the builders that assemble them.
//!
//! Round 1 runs on hardcoded seed instructions (no orchestrator output
//! exists yet); later rounds take instructions and context bullets from the
//! previous round's debate packets.

use std::collections::BTreeMap;

use crate::compiler::{fill_template, TemplateValue, BEGIN_MARKER, END_MARKER};
use crate::document::EvaluationDocument;
use crate::role::{ParticipantRole, DEBATE_ROLES};
use crate::session::ResponseRecord;

/// Template for every participant-facing prompt.
pub const PARTICIPANT_TEMPLATE: &str = "\
DEBATE TOPIC: {{topic}}
ROUND: {{round}}
ROLE: {{role}}

INSTRUCTIONS:
{{instructions}}

CONTEXT:
{{context_bullets}}

RESPONSE FORMAT (STRICT):
1. Top Claims (max 10 bullets)
2. For each claim: Reason A / B / C
3. Confidence per claim (High / Medium / Low)
4. Biggest uncertainties (3 bullets)
5. What would change my mind? (1-2 lines)
";

/// System prompt framing the orchestrator's job and output contract.
pub const ORCHESTRATOR_SYSTEM_PROMPT: &str = "\
You are the DEBATE ORCHESTRATOR. Your goal is to facilitate a high-quality \
debate between three AI participants:
1. RESEARCHER (context and trends)
2. CRITIC (skeptical challenge)
3. DEBATER (argument and synthesis)

You do NOT participate directly in the debate. Your job is to:
1. Analyze the current state of the debate.
2. Score each participant.
3. Generate the next debate packet for each participant with specific instructions.

OUTPUT FORMAT:
You must output a STRICT JSON block. Do not output anything else outside this block.

BEGIN_DEBATE_JSON
{
  \"round\": <number>,
  \"scores\": {
    \"researcher\": { \"score\": <0-5>, \"feedback\": \"...\" },
    \"critic\": { \"score\": <0-5>, \"feedback\": \"...\" },
    \"debater\": { \"score\": <0-5>, \"feedback\": \"...\" }
  },
  \"packets\": {
    \"researcher\": { \"role\": \"Researcher\", \"instructions\": \"...\", \"context_bullets\": [\"...\"] },
    \"critic\": { \"role\": \"Critic\", \"instructions\": \"...\", \"context_bullets\": [\"...\"] },
    \"debater\": { \"role\": \"Debater\", \"instructions\": \"...\", \"context_bullets\": [\"...\"] }
  },
  \"synthesis\": {
    \"current_consensus\": \"...\",
    \"major_disagreements\": \"...\"
  }
}
END_DEBATE_JSON
";

/// Template for the per-round evaluation request sent to the orchestrator.
pub const ORCHESTRATOR_PROMPT_TEMPLATE: &str = "\
{{system}}

CURRENT STATUS:
Topic: {{topic}}
Round: {{round}}

RESPONSES:
RESEARCHER: {{researcher}}
CRITIC: {{critic}}
DEBATER: {{debater}}
";

/// Instructions used when a role has no packet to draw from.
pub const FALLBACK_INSTRUCTIONS: &str = "Contribute to the debate.";

/// Context bullet for round 1.
pub const SEED_CONTEXT: &str = "Start of debate.";

/// Context bullet used when a later-round packet carries no bullets.
pub const FALLBACK_CONTEXT: &str = "Previous round completed.";

/// Hardcoded round-1 instructions per debating role.
pub fn seed_instructions(role: ParticipantRole) -> &'static str {
    match role {
        ParticipantRole::Debater => "Argue for the motion. Be bold and constructive.",
        ParticipantRole::Critic => "Critique the premise. Be skeptical.",
        ParticipantRole::Researcher => "Provide research context and trends.",
        ParticipantRole::Orchestrator => FALLBACK_INSTRUCTIONS,
    }
}

/// Per-role instructions for a round: seeds for round 1, otherwise the
/// previous round's packet (with a fallback when the packet is absent).
pub fn round_instructions(
    role: ParticipantRole,
    round: u8,
    previous: Option<&EvaluationDocument>,
) -> String {
    if round == 1 {
        return seed_instructions(role).to_string();
    }
    previous
        .and_then(|doc| doc.packet(role))
        .map(|packet| packet.instructions.clone())
        .unwrap_or_else(|| FALLBACK_INSTRUCTIONS.to_string())
}

/// Per-role context bullets for a round, same sourcing as instructions.
pub fn round_context(
    role: ParticipantRole,
    round: u8,
    previous: Option<&EvaluationDocument>,
) -> Vec<String> {
    if round == 1 {
        return vec![SEED_CONTEXT.to_string()];
    }
    previous
        .and_then(|doc| doc.packet(role))
        .map(|packet| packet.context_bullets.clone())
        .filter(|bullets| !bullets.is_empty())
        .unwrap_or_else(|| vec![FALLBACK_CONTEXT.to_string()])
}

/// Assemble the prompt for one debating participant.
pub fn build_participant_prompt(
    topic: &str,
    round: u8,
    role: ParticipantRole,
    instructions: &str,
    context_bullets: &[String],
) -> String {
    fill_template(
        PARTICIPANT_TEMPLATE,
        &[
            ("topic", TemplateValue::Text(topic.to_string())),
            ("round", TemplateValue::Text(round.to_string())),
            ("role", TemplateValue::Text(role.label().to_string())),
            ("instructions", TemplateValue::Text(instructions.to_string())),
            (
                "context_bullets",
                TemplateValue::Bullets(context_bullets.to_vec()),
            ),
        ],
    )
}

/// Assemble the evaluation prompt embedding the round's three responses in
/// fixed named slots.
pub fn build_orchestrator_prompt(
    topic: &str,
    round: u8,
    responses: &BTreeMap<ParticipantRole, ResponseRecord>,
) -> String {
    let slot = |role: ParticipantRole| -> TemplateValue {
        TemplateValue::Text(
            responses
                .get(&role)
                .map(|record| record.text.clone())
                .unwrap_or_default(),
        )
    };
    fill_template(
        ORCHESTRATOR_PROMPT_TEMPLATE,
        &[
            (
                "system",
                TemplateValue::Text(ORCHESTRATOR_SYSTEM_PROMPT.to_string()),
            ),
            ("topic", TemplateValue::Text(topic.to_string())),
            ("round", TemplateValue::Text(round.to_string())),
            ("researcher", slot(ParticipantRole::Researcher)),
            ("critic", slot(ParticipantRole::Critic)),
            ("debater", slot(ParticipantRole::Debater)),
        ],
    )
}
