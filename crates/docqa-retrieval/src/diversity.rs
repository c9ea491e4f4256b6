//! Maximal marginal relevance selection.
//!
//! Each step picks the pool chunk maximizing
//! `λ · relevance(query, chunk) − (1 − λ) · max_sim(chunk, selected)`.

use docqa_core::traits::ChunkStore;
use docqa_core::types::{RetrievalCandidate, ScoredChunk, Strategy};
use docqa_core::Result;
use docqa_embed::cosine_similarity;

use crate::similarity::fetch;

/// Fetch `top_k * fetch_factor` similar chunks and pick `top_k` of them by MMR.
pub async fn diversity_retrieve(
    store: &dyn ChunkStore,
    query_embedding: &[f32],
    top_k: usize,
    lambda: f32,
    fetch_factor: usize,
) -> Result<Vec<RetrievalCandidate>> {
    let fetch_k = top_k.saturating_mul(fetch_factor.max(1));
    let pool = fetch(store, query_embedding, fetch_k).await?;
    Ok(mmr_select(pool, top_k, lambda))
}

/// Greedy MMR over an already-scored pool. The pool is expected sorted by
/// relevance with unique chunks; on equal MMR scores the earlier pool entry wins.
pub fn mmr_select(pool: Vec<ScoredChunk>, top_k: usize, lambda: f32) -> Vec<RetrievalCandidate> {
    let mut remaining = pool;
    let mut selected: Vec<RetrievalCandidate> = Vec::with_capacity(top_k.min(remaining.len()));
    while selected.len() < top_k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (i, candidate) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|s| cosine_similarity(&candidate.chunk.embedding, &s.chunk.embedding))
                .fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |a| a.max(sim))))
                .unwrap_or(0.0);
            let score = lambda * candidate.score - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_idx = i;
            }
        }
        let pick = remaining.remove(best_idx);
        selected.push(RetrievalCandidate {
            relevance: pick.score,
            score: best_score,
            rank: selected.len() + 1,
            strategy: Strategy::Diversity,
            chunk: pick.chunk,
        });
    }
    selected
}
