//! In-memory chunk store with brute-force cosine search.
//!
//! Sized for a handful of uploaded documents: every search scans all chunks.
//! Writes (`add_documents`, `clear`) take the write lock and happen between
//! query cycles; searches share the read lock.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use docqa_core::traits::ChunkStore;
use docqa_core::types::{Chunk, ScoredChunk};
use docqa_core::{Error, Result};
use docqa_embed::cosine_similarity;

mod snapshot;

pub use snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub chunk_count: usize,
    pub document_count: usize,
    pub dim: Option<usize>,
    pub has_data: bool,
}

#[derive(Default)]
struct Inner {
    dim: Option<usize>,
    chunks: Vec<Arc<Chunk>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Open the snapshot at `path`, or start empty when it does not exist yet.
    pub async fn open(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            info!(path = %path.display(), "no snapshot yet, starting empty store");
            return Ok(Self::new());
        }
        let raw = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        let store = Self::from_snapshot(snapshot)?;
        info!(path = %path.display(), chunks = store.inner.read().await.chunks.len(), "loaded store snapshot");
        Ok(store)
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        snapshot.check()?;
        let inner = Inner { dim: snapshot.dim, chunks: snapshot.chunks.into_iter().map(Arc::new).collect() };
        Ok(Self { inner: RwLock::new(inner) })
    }

    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().await;
        Snapshot::new(inner.dim, inner.chunks.iter().map(|c| c.as_ref().clone()).collect())
    }

    /// Write the current contents to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&self.snapshot().await)?;
        tokio::fs::write(path, bytes).await?;
        debug!(path = %path.display(), "saved store snapshot");
        Ok(())
    }

    /// Insert chunks, replacing every existing chunk of the documents being added.
    ///
    /// All embeddings must share one dimension, matching what is already stored.
    pub async fn add_documents(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() { return Ok(0); }
        let mut inner = self.inner.write().await;
        let dim = inner.dim.unwrap_or(chunks[0].embedding.len());
        if dim == 0 {
            return Err(Error::InvalidConfig("chunk embeddings must not be empty".to_string()));
        }
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dim) {
            return Err(Error::InvalidConfig(format!(
                "chunk {} has embedding dimension {}, store expects {}",
                bad.id,
                bad.embedding.len(),
                dim
            )));
        }
        let replaced: BTreeSet<&str> = chunks.iter().map(|c| c.doc_name.as_str()).collect();
        let before = inner.chunks.len();
        inner.chunks.retain(|c| !replaced.contains(c.doc_name.as_str()));
        let removed = before - inner.chunks.len();
        let added = chunks.len();
        inner.chunks.extend(chunks.into_iter().map(Arc::new));
        inner.dim = Some(dim);
        info!(added, removed, total = inner.chunks.len(), "indexed chunks");
        Ok(added)
    }

    /// Drop every chunk and forget the embedding dimension.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.chunks.clear();
        inner.dim = None;
        info!("cleared store");
    }

    pub async fn status(&self) -> StoreStatus {
        let inner = self.inner.read().await;
        let documents: BTreeSet<&str> = inner.chunks.iter().map(|c| c.doc_name.as_str()).collect();
        StoreStatus {
            chunk_count: inner.chunks.len(),
            document_count: documents.len(),
            dim: inner.dim,
            has_data: !inner.chunks.is_empty(),
        }
    }

    /// Distinct document names, sorted.
    pub async fn documents(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let documents: BTreeSet<String> = inner.chunks.iter().map(|c| c.doc_name.clone()).collect();
        documents.into_iter().collect()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().await.chunks.len())
    }

    async fn similarity_search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let inner = self.inner.read().await;
        if let Some(dim) = inner.dim {
            if dim != query_embedding.len() {
                return Err(Error::Retrieval(format!(
                    "query embedding has dimension {}, store holds dimension {}",
                    query_embedding.len(),
                    dim
                )));
            }
        }
        let mut hits: Vec<ScoredChunk> = inner
            .chunks
            .iter()
            .map(|c| ScoredChunk { chunk: Arc::clone(c), score: cosine_similarity(query_embedding, &c.embedding) })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk.id.cmp(&b.chunk.id)));
        hits.truncate(top_k);
        debug!(hits = hits.len(), top_k, "similarity search");
        Ok(hits)
    }
}
