//! The two user-visible non-answers. Composition is deterministic and needs
//! no model call.

use docqa_core::types::{AnswerOutcome, ContextBlock, FusedCandidate, OutcomeKind};

pub const NO_DOCUMENTS_MESSAGE: &str = "No documents uploaded yet. Please upload PDF/DOCX and try again.";

const NO_ANSWER_PREFIX: &str = "No info in docs about the asked question";

pub fn no_documents() -> AnswerOutcome {
    AnswerOutcome {
        answer_text: NO_DOCUMENTS_MESSAGE.to_string(),
        source: None,
        grounded: false,
        kind: OutcomeKind::NoDocuments,
        confidence: 0.0,
        closest_documents: Vec::new(),
    }
}

/// Message embedding the (shortened) query and the closest document names.
/// An empty `closest` list drops the "Closest documents" clause.
pub fn no_answer(query: &str, closest: Vec<String>, display_chars: usize) -> AnswerOutcome {
    let shown = shorten_query(query, display_chars);
    let answer_text = if closest.is_empty() {
        format!("{NO_ANSWER_PREFIX}: '{shown}'.")
    } else {
        format!("{NO_ANSWER_PREFIX}: '{shown}'. Closest documents: {}.", closest.join(", "))
    };
    AnswerOutcome {
        answer_text,
        source: None,
        grounded: false,
        kind: OutcomeKind::NoAnswer,
        confidence: 0.0,
        closest_documents: closest,
    }
}

/// Keep at most `max_chars` characters, marking the cut with `…`.
pub fn shorten_query(query: &str, max_chars: usize) -> String {
    match query.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &query[..cut]),
        None => query.to_string(),
    }
}

/// Distinct document names to offer as "closest documents".
///
/// Sources of the context block when it has any; otherwise the documents of
/// the best `limit` fused candidates, whatever their relevance.
pub fn closest_documents(context: &ContextBlock, fused: &[FusedCandidate], limit: usize) -> Vec<String> {
    if !context.is_empty() {
        return context.sources();
    }
    let mut names: Vec<String> = Vec::new();
    for candidate in fused.iter().take(limit) {
        if !names.contains(&candidate.chunk.doc_name) {
            names.push(candidate.chunk.doc_name.clone());
        }
    }
    names
}
