//! Reciprocal Rank Fusion: score = Σ 1/(k + rank_i)
//!
//! Merges the similarity and diversity rankings without normalizing their
//! scores. A chunk missing from a list contributes 0 for that list.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use docqa_core::types::{Chunk, ChunkId, FusedCandidate, RetrievalCandidate};

struct Accumulator {
    chunk: Arc<Chunk>,
    fused_score: f64,
    relevance: f32,
    similarity_rank: Option<usize>,
    diversity_rank: Option<usize>,
}

/// Score contribution of a 1-indexed `rank` under damping constant `k`.
pub fn rrf_contribution(k: u32, rank: usize) -> f64 {
    1.0 / (f64::from(k) + rank as f64)
}

/// Fuse both rankings into one, best first.
///
/// Ranks are list positions (1-indexed); a repeated chunk within one list
/// only counts at its first position. Ordering is total: fused score
/// descending, then similarity rank ascending (absent last), then chunk id.
pub fn reciprocal_rank_fusion(similarity: &[RetrievalCandidate], diversity: &[RetrievalCandidate], k: u32) -> Vec<FusedCandidate> {
    let mut by_id: BTreeMap<ChunkId, Accumulator> = BTreeMap::new();

    for (list, is_similarity) in [(similarity, true), (diversity, false)] {
        for (pos, candidate) in list.iter().enumerate() {
            let rank = pos + 1;
            let entry = by_id.entry(candidate.chunk.id.clone()).or_insert_with(|| Accumulator {
                chunk: Arc::clone(&candidate.chunk),
                fused_score: 0.0,
                relevance: candidate.relevance,
                similarity_rank: None,
                diversity_rank: None,
            });
            let slot = if is_similarity { &mut entry.similarity_rank } else { &mut entry.diversity_rank };
            if slot.is_some() {
                continue;
            }
            *slot = Some(rank);
            entry.fused_score += rrf_contribution(k, rank);
            entry.relevance = entry.relevance.max(candidate.relevance);
        }
    }

    let mut fused: Vec<FusedCandidate> = by_id
        .into_values()
        .map(|acc| FusedCandidate {
            chunk: acc.chunk,
            fused_score: acc.fused_score,
            fused_rank: 0,
            relevance: acc.relevance,
            similarity_rank: acc.similarity_rank,
            diversity_rank: acc.diversity_rank,
        })
        .collect();
    fused.sort_by(compare_fused);
    for (i, candidate) in fused.iter_mut().enumerate() {
        candidate.fused_rank = i + 1;
    }
    fused
}

fn compare_fused(a: &FusedCandidate, b: &FusedCandidate) -> Ordering {
    b.fused_score
        .total_cmp(&a.fused_score)
        .then_with(|| match (a.similarity_rank, b.similarity_rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.chunk.id.cmp(&b.chunk.id))
}
