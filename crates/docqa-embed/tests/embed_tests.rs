use docqa_core::traits::Embedder;
use docqa_embed::{cosine_similarity, HashEmbedder};

#[tokio::test]
async fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::default();
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[tokio::test]
async fn shared_terms_score_above_unrelated_text() {
    let embedder = HashEmbedder::default();
    let q = embedder.embed("How long do refunds take?").await.unwrap();
    let related = embedder.embed("Refunds are processed within 14 days.").await.unwrap();
    let same = embedder.embed("refunds TAKE long").await.unwrap();

    assert!(cosine_similarity(&q, &related) > 0.0);
    assert!((cosine_similarity(&q, &same) - 1.0).abs() < 1e-5, "case and stopwords are ignored");
}

#[tokio::test]
async fn stopword_only_text_embeds_to_zero_vector() {
    let embedder = HashEmbedder::new(64);
    let v = embedder.embed("what is the").await.unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
    assert_eq!(cosine_similarity(&v, &v), 0.0);
}

#[test]
fn cosine_handles_mismatched_dimensions() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
}
