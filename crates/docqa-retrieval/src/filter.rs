use docqa_core::config::RelevanceBasis;
use docqa_core::types::FusedCandidate;

/// Drop candidates below `min_relevance`, then keep at most `rerank_k` in fused order.
///
/// An empty result is the ordinary "nothing relevant" case, not an error.
pub fn filter_relevant(fused: &[FusedCandidate], min_relevance: f64, rerank_k: usize, basis: RelevanceBasis) -> Vec<FusedCandidate> {
    fused
        .iter()
        .filter(|c| c.relevance_for(basis) >= min_relevance)
        .take(rerank_k)
        .cloned()
        .collect()
}
