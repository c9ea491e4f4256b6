use std::collections::HashSet;

use docqa_core::traits::ChunkStore;
use docqa_core::types::{RetrievalCandidate, ScoredChunk, Strategy};
use docqa_core::{Error, Result};

/// Top `top_k` chunks by raw similarity, best first.
///
/// An empty answer from the store is a retrieval error: the caller checks for
/// an empty store before retrieving, so reaching here with nothing means the
/// store is inconsistent or unreachable.
pub async fn similarity_retrieve(store: &dyn ChunkStore, query_embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalCandidate>> {
    let hits = fetch(store, query_embedding, top_k).await?;
    Ok(hits
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, hit)| RetrievalCandidate {
            relevance: hit.score,
            score: hit.score,
            rank: i + 1,
            strategy: Strategy::Similarity,
            chunk: hit.chunk,
        })
        .collect())
}

/// Query the store and normalize its answer: descending score, ties by chunk
/// id, one row per chunk.
pub(crate) async fn fetch(store: &dyn ChunkStore, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
    let mut hits = store.similarity_search(query_embedding, top_k).await.map_err(|e| match e {
        Error::Retrieval(_) => e,
        other => Error::Retrieval(other.to_string()),
    })?;
    if hits.is_empty() {
        return Err(Error::Retrieval("chunk store returned no candidates".to_string()));
    }
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk.id.cmp(&b.chunk.id)));
    let mut seen = HashSet::new();
    hits.retain(|h| seen.insert(h.chunk.id.clone()));
    Ok(hits)
}
