//! Prompt compiler — template substitution and evaluation extraction.
//!
//! Two jobs: fill a prompt template with round/role/context data, and pull
//! the strict JSON evaluation block back out of the orchestrator's free-text
//! reply. Extraction is deliberately asymmetric: first occurrence of the
//! begin marker, *last* occurrence of the end marker, so marker text echoed
//! earlier in the reply does not truncate the document.

use thiserror::Error;

use crate::document::EvaluationDocument;

/// Marker opening the orchestrator's JSON block.
pub const BEGIN_MARKER: &str = "BEGIN_DEBATE_JSON";
/// Marker closing the orchestrator's JSON block.
pub const END_MARKER: &str = "END_DEBATE_JSON";

/// Error extracting an evaluation document from an orchestrator reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Either marker is absent from the reply.
    #[error("evaluation markers not found in orchestrator reply")]
    MarkersNotFound,
    /// The text between the markers does not decode to the required shape.
    #[error("malformed evaluation document: {0}")]
    MalformedDocument(String),
}

/// A value substituted into a template placeholder.
#[derive(Debug, Clone)]
pub enum TemplateValue {
    /// Plain text, inserted verbatim.
    Text(String),
    /// List rendered as one `- item` line per element, order preserved.
    Bullets(Vec<String>),
}

impl TemplateValue {
    fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bullets(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Fill `{{key}}` placeholders in a template.
///
/// Each key replaces the first occurrence of its placeholder. A placeholder
/// with no matching key is left in the output verbatim — an intentional
/// passthrough, not an error, so a template mismatch is visible in the
/// produced prompt instead of silently dropped.
pub fn fill_template(template: &str, data: &[(&str, TemplateValue)]) -> String {
    let mut out = template.to_string();
    for (key, value) in data {
        let placeholder = format!("{{{{{}}}}}", key);
        out = out.replacen(&placeholder, &value.render(), 1);
    }
    out
}

/// Extract the evaluation document embedded in an orchestrator reply.
pub fn extract_evaluation(reply: &str) -> Result<EvaluationDocument, ExtractError> {
    let begin = reply.find(BEGIN_MARKER).ok_or(ExtractError::MarkersNotFound)?;
    let end = reply.rfind(END_MARKER).ok_or(ExtractError::MarkersNotFound)?;

    // An end marker only before the begin marker yields an empty body and
    // fails decoding, same as any other malformed reply.
    let body = reply
        .get(begin + BEGIN_MARKER.len()..end)
        .unwrap_or("")
        .trim();

    let doc: EvaluationDocument = serde_json::from_str(body)
        .map_err(|e| ExtractError::MalformedDocument(e.to_string()))?;
    doc.validate().map_err(ExtractError::MalformedDocument)?;
    Ok(doc)
}

/// Format a document between the markers — the inverse of
/// [`extract_evaluation`], used when a human supplies a substitute reply.
pub fn format_evaluation(doc: &EvaluationDocument) -> String {
    // Serializing a fully-typed document cannot fail.
    let json = serde_json::to_string_pretty(doc).unwrap_or_default();
    format!("{}\n{}\n{}", BEGIN_MARKER, json, END_MARKER)
}
