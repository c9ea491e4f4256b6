//! Candidate retrieval for one question: similarity + MMR retrieval over a
//! shared query embedding, reciprocal-rank fusion, relevance filtering and
//! context compression.

use tracing::debug;

use docqa_core::config::PipelineConfig;
use docqa_core::traits::ChunkStore;
use docqa_core::types::{FusedCandidate, RetrievalCandidate};
use docqa_core::Result;

pub mod context;
pub mod diversity;
pub mod filter;
pub mod fusion;
pub mod similarity;

pub use context::compress;
pub use diversity::{diversity_retrieve, mmr_select};
pub use filter::filter_relevant;
pub use fusion::{reciprocal_rank_fusion, rrf_contribution};
pub use similarity::similarity_retrieve;

/// Both retrievers against one read-only store snapshot.
pub struct DualRetriever<'a> {
    store: &'a dyn ChunkStore,
    config: &'a PipelineConfig,
}

/// The two ranked lists and their fusion.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub similarity: Vec<RetrievalCandidate>,
    pub diversity: Vec<RetrievalCandidate>,
    pub fused: Vec<FusedCandidate>,
}

impl<'a> DualRetriever<'a> {
    pub fn new(store: &'a dyn ChunkStore, config: &'a PipelineConfig) -> Self { Self { store, config } }

    /// Run both retrievers concurrently, wait for both, then fuse.
    ///
    /// Either retriever failing fails the whole call.
    pub async fn retrieve(&self, query_embedding: &[f32]) -> Result<Retrieved> {
        let cfg = self.config;
        let (similarity, diversity) = futures::try_join!(
            similarity_retrieve(self.store, query_embedding, cfg.top_k),
            diversity_retrieve(self.store, query_embedding, cfg.mmr_top_k, cfg.mmr_lambda, cfg.mmr_fetch_factor),
        )?;
        let fused = reciprocal_rank_fusion(&similarity, &diversity, cfg.rrf_k);
        debug!(similarity = similarity.len(), diversity = diversity.len(), fused = fused.len(), "retrieved candidates");
        Ok(Retrieved { similarity, diversity, fused })
    }

    /// Fused candidates that clear the threshold, capped at `rerank_k`.
    pub fn survivors(&self, fused: &[FusedCandidate]) -> Vec<FusedCandidate> {
        filter_relevant(fused, self.config.min_relevance, self.config.rerank_k, self.config.relevance_basis)
    }
}
