use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docqa_core::text::content_tokens;
use docqa_core::traits::Embedder;
use docqa_core::Result;

mod vector;

pub use vector::{cosine_similarity, l2_normalize};

pub const DEFAULT_HASH_DIM: usize = 1024;

/// Deterministic bag-of-terms embedder: every content term is hashed into one
/// bucket, then the vector is L2-normalized. Texts sharing no content terms
/// are (up to hash collisions) orthogonal.
///
/// Used offline, in development and in tests; no model download needed.
pub struct HashEmbedder { dim: usize }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in content_tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            // weight in [0.5, 1.0] so a shared term never vanishes
            let val = 0.5 + 0.5 * (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self { Self::new(DEFAULT_HASH_DIM) }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1|true` asks binaries to use [`HashEmbedder`].
pub fn use_fake_embeddings() -> bool {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake { tracing::info!("using HashEmbedder"); }
    use_fake
}
