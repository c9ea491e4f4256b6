//! Domain types flowing through one question-answer cycle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RelevanceBasis;

pub type ChunkId = String;

/// An immutable fragment of an uploaded document.
///
/// - `id`: unique chunk identifier (`<doc_name>:<position>`)
/// - `doc_name`: name of the owning document, used for attribution
/// - `text`: the raw text payload
/// - `embedding`: vector computed at ingestion time
/// - `position`: index of the chunk within its document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_name: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub position: usize,
}

/// One row of a similarity search: a chunk and its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    pub score: f32,
}

/// Indicates which retriever produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Strategy {
    Similarity,
    Diversity,
}

/// A chunk as ranked by one retriever.
///
/// `score` is strategy-specific (raw similarity or MMR score); `relevance`
/// is always the query-chunk similarity so both strategies stay comparable.
/// `rank` is 1-indexed.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub chunk: Arc<Chunk>,
    pub score: f32,
    pub relevance: f32,
    pub rank: usize,
    pub strategy: Strategy,
}

/// A chunk after reciprocal-rank fusion. At most one per chunk per query.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub chunk: Arc<Chunk>,
    pub fused_score: f64,
    pub fused_rank: usize,
    pub relevance: f32,
    pub similarity_rank: Option<usize>,
    pub diversity_rank: Option<usize>,
}

impl FusedCandidate {
    /// The value the relevance threshold is compared against.
    pub fn relevance_for(&self, basis: RelevanceBasis) -> f64 {
        match basis {
            RelevanceBasis::Similarity => f64::from(self.relevance),
            RelevanceBasis::Fused => self.fused_score,
        }
    }
}

/// Inline attribution tag placed before every context segment.
pub fn source_tag(source: &str) -> String {
    format!("[Source: {source}]")
}

pub const SOURCE_TAG_OPEN: &str = "[Source: ";

/// One (source document, chunk text) pair of a [`ContextBlock`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSegment {
    pub source: String,
    pub chunk_id: ChunkId,
    pub text: String,
    pub truncated: bool,
}

impl ContextSegment {
    pub fn new(source: &str, chunk_id: &str, text: &str) -> Self {
        Self { source: source.to_string(), chunk_id: chunk_id.to_string(), text: text.to_string(), truncated: false }
    }

    /// Characters taken by the tag line that precedes the text.
    pub fn header_chars(source: &str) -> usize {
        source_tag(source).chars().count() + 1
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", source_tag(&self.source), self.text)
    }

    pub fn rendered_chars(&self) -> usize {
        Self::header_chars(&self.source) + self.text.chars().count()
    }
}

/// Ordered, budgeted context handed to the generator and the validator.
///
/// Segment order is fused rank order, best first. The serialized length
/// never exceeds `max_chars` unless the block holds a single segment whose
/// tag line alone is longer than the budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBlock {
    pub segments: Vec<ContextSegment>,
    pub max_chars: usize,
}

impl ContextBlock {
    pub const SEPARATOR: &'static str = "\n\n---\n\n";

    pub fn new(max_chars: usize) -> Self {
        Self { segments: Vec::new(), max_chars }
    }

    pub fn separator_chars() -> usize {
        Self::SEPARATOR.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Serialized length in characters.
    pub fn char_len(&self) -> usize {
        let body: usize = self.segments.iter().map(ContextSegment::rendered_chars).sum();
        body + self.segments.len().saturating_sub(1) * Self::separator_chars()
    }

    pub fn push(&mut self, segment: ContextSegment) {
        self.segments.push(segment);
    }

    pub fn render(&self) -> String {
        self.segments.iter().map(ContextSegment::render).collect::<Vec<_>>().join(Self::SEPARATOR)
    }

    /// Distinct source names in segment order.
    pub fn sources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for seg in &self.segments {
            if !out.contains(&seg.source) {
                out.push(seg.source.clone());
            }
        }
        out
    }
}

/// A draft answer together with the context it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub context: ContextBlock,
}

/// Outcome of the grounding check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub answer_text: String,
    pub grounded: bool,
    pub source: Option<String>,
}

impl ValidationResult {
    pub fn unsupported() -> Self {
        Self { answer_text: String::new(), grounded: false, source: None }
    }
}

/// Which of the user-visible outputs a cycle produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Grounded,
    NoDocuments,
    NoAnswer,
}

/// What `answer_question` hands back to the caller.
///
/// Generic failures are the `Err` side of the call, never a variant here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub answer_text: String,
    pub source: Option<String>,
    pub grounded: bool,
    pub kind: OutcomeKind,
    pub confidence: f32,
    pub closest_documents: Vec<String>,
}
