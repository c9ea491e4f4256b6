use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::ScoredChunk;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("embedder returned no vector".to_string()))
    }
}

/// Read side of the chunk index as the pipeline sees it.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Number of indexed chunks; zero means no documents are uploaded.
    async fn len(&self) -> Result<usize>;

    /// Up to `top_k` chunks ordered by descending similarity to `query_embedding`.
    async fn similarity_search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}
