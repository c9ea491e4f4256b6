//! Second model pass plus the deterministic reading of its reply.
//!
//! The model is asked to keep only supported claims. Its reply is then
//! checked sentence by sentence against the context segments: each sentence
//! is attributed to the segment covering most of its content terms, and
//! sentences without enough coverage, or quoting a number no segment
//! contains, are dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use docqa_core::text::{content_terms, split_sentences, term_coverage};
use docqa_core::traits::Generator;
use docqa_core::types::{Answer, ContextBlock, ValidationResult, SOURCE_TAG_OPEN};
use docqa_core::{Error, Result};

use crate::prompts::{is_unsupported_marker, validation_prompt};

/// How strictly validator output is checked against the context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentenceCheck {
    pub enabled: bool,
    /// Minimum fraction of a sentence's content terms found in one segment.
    pub min_support: f32,
}

impl Default for SentenceCheck {
    fn default() -> Self {
        Self { enabled: true, min_support: 0.5 }
    }
}

pub struct Validator {
    generator: Arc<dyn Generator>,
    check: SentenceCheck,
}

impl Validator {
    pub fn new(generator: Arc<dyn Generator>, check: SentenceCheck) -> Self {
        Self { generator, check }
    }

    /// Exactly one grounding call per draft; no retries.
    pub async fn validate(&self, question: &str, answer: &Answer) -> Result<ValidationResult> {
        let prompt = validation_prompt(question, &answer.context.render(), &answer.text);
        let reply = self.generator.generate(&prompt).await.map_err(Error::into_generation)?;
        let result = interpret(&reply, &answer.context, self.check);
        debug!(grounded = result.grounded, source = ?result.source, "validation finished");
        Ok(result)
    }
}

/// Turn the validator's reply into a [`ValidationResult`].
///
/// Empty replies, the unsupported marker and replies with nothing left after
/// the sentence check are ungrounded. Inline `[Source: x]` tags are removed
/// from the text and counted as votes for `x`.
pub fn interpret(reply: &str, context: &ContextBlock, check: SentenceCheck) -> ValidationResult {
    if context.is_empty() || reply.trim().is_empty() || is_unsupported_marker(reply) {
        return ValidationResult::unsupported();
    }

    let (stripped, tagged) = strip_source_tags(reply);
    let segment_terms: Vec<BTreeSet<String>> = context.segments.iter().map(|s| content_terms(&s.text)).collect();
    let mut votes = vec![0usize; context.len()];
    for name in &tagged {
        if let Some(idx) = context.segments.iter().position(|s| &s.source == name) {
            votes[idx] += 1;
        }
    }

    let mut kept_lines: Vec<String> = Vec::new();
    let mut kept_sentences = 0usize;
    for line in stripped.lines() {
        let mut kept: Vec<&str> = Vec::new();
        for sentence in split_sentences(line) {
            if is_unsupported_marker(sentence) {
                continue;
            }
            match attribute(sentence, context, &segment_terms, check) {
                Some(Some(idx)) => {
                    votes[idx] += 1;
                    kept.push(sentence);
                }
                Some(None) => kept.push(sentence),
                None => debug!(sentence, "dropped unsupported sentence"),
            }
        }
        if !kept.is_empty() {
            kept_sentences += kept.len();
            kept_lines.push(kept.join(" "));
        }
    }

    if kept_sentences == 0 {
        return ValidationResult::unsupported();
    }
    ValidationResult {
        answer_text: kept_lines.join("\n"),
        grounded: true,
        source: Some(best_fit_source(context, &votes)),
    }
}

/// `None` drops the sentence; `Some(Some(i))` keeps it attributed to segment
/// `i`; `Some(None)` keeps it without attribution (check disabled, no overlap).
fn attribute(sentence: &str, context: &ContextBlock, segment_terms: &[BTreeSet<String>], check: SentenceCheck) -> Option<Option<usize>> {
    let terms = content_terms(sentence);
    if terms.is_empty() {
        let needle = sentence.to_lowercase();
        return context
            .segments
            .iter()
            .position(|s| s.text.to_lowercase().contains(&needle))
            .map(Some);
    }

    // Figures must be quoted exactly: a segment missing any of them cannot support the sentence.
    let figures: Vec<&String> = terms.iter().filter(|t| t.chars().any(|c| c.is_ascii_digit())).collect();
    let mut best: Option<(usize, f32)> = None;
    for (idx, haystack) in segment_terms.iter().enumerate() {
        if check.enabled && !figures.iter().all(|f| haystack.contains(*f)) {
            continue;
        }
        let coverage = term_coverage(&terms, haystack);
        if best.map_or(true, |(_, b)| coverage > b) {
            best = Some((idx, coverage));
        }
    }
    let (idx, coverage) = best?;
    if check.enabled && coverage < check.min_support {
        return None;
    }
    Some((coverage > 0.0).then_some(idx))
}

/// Most voted segment source; ties go to the earliest segment. With no votes
/// at all the first segment is the best fit.
fn best_fit_source(context: &ContextBlock, votes: &[usize]) -> String {
    // Votes are per segment; a document spread over several segments sums them.
    let mut per_source: Vec<(&str, usize)> = Vec::new();
    for (segment, count) in context.segments.iter().zip(votes) {
        match per_source.iter_mut().find(|(name, _)| *name == segment.source) {
            Some((_, total)) => *total += count,
            None => per_source.push((segment.source.as_str(), *count)),
        }
    }
    let mut best = per_source[0];
    for entry in &per_source[1..] {
        if entry.1 > best.1 {
            best = *entry;
        }
    }
    best.0.to_string()
}

/// Remove `[Source: x]` tags, returning the cleaned text and the tagged names.
fn strip_source_tags(text: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(text.len());
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(SOURCE_TAG_OPEN) {
        let after = &rest[start + SOURCE_TAG_OPEN.len()..];
        let Some(end) = after.find(']') else { break };
        out.push_str(&rest[..start]);
        names.push(after[..end].trim().to_string());
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    (out, names)
}
