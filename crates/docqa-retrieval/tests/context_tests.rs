use std::sync::Arc;

use docqa_core::config::RelevanceBasis;
use docqa_core::types::{Chunk, ContextSegment, FusedCandidate};
use docqa_retrieval::{compress, filter_relevant};
use proptest::prelude::*;

fn candidate(id: &str, doc: &str, text: &str, relevance: f32, rank: usize) -> FusedCandidate {
    FusedCandidate {
        chunk: Arc::new(Chunk {
            id: id.to_string(),
            doc_name: doc.to_string(),
            text: text.to_string(),
            embedding: vec![1.0],
            position: 0,
        }),
        fused_score: 1.0 / (60.0 + rank as f64),
        fused_rank: rank,
        relevance,
        similarity_rank: Some(rank),
        diversity_rank: None,
    }
}

fn ranked(relevances: &[f32]) -> Vec<FusedCandidate> {
    relevances
        .iter()
        .enumerate()
        .map(|(i, r)| candidate(&format!("c{i}"), "doc.txt", "text", *r, i + 1))
        .collect()
}

#[test]
fn filter_keeps_fused_order() {
    let fused = ranked(&[0.9, 0.2, 0.5, 0.8]);
    let kept = filter_relevant(&fused, 0.35, 8, RelevanceBasis::Similarity);
    let ids: Vec<&str> = kept.iter().map(|c| c.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["c0", "c2", "c3"]);
}

#[test]
fn filter_on_fused_basis_uses_rrf_score() {
    let fused = ranked(&[0.9, 0.9, 0.9]);
    let kept = filter_relevant(&fused, 1.0 / 61.5, 8, RelevanceBasis::Fused);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].chunk.id, "c0");
}

#[test]
fn nothing_relevant_is_empty_not_error() {
    let fused = ranked(&[0.1, 0.2]);
    assert!(filter_relevant(&fused, 0.35, 8, RelevanceBasis::Similarity).is_empty());
}

#[test]
fn compress_tags_each_segment_with_its_source() {
    let fused = vec![
        candidate("a:0", "a.pdf", "Alpha facts.", 0.9, 1),
        candidate("b:0", "b.docx", "Beta facts.", 0.8, 2),
    ];
    let block = compress(&fused, 12_000);
    assert_eq!(block.render(), "[Source: a.pdf]\nAlpha facts.\n\n---\n\n[Source: b.docx]\nBeta facts.");
    assert_eq!(block.sources(), vec!["a.pdf", "b.docx"]);
}

#[test]
fn compress_stops_at_first_overflow() {
    let fused = vec![
        candidate("a:0", "a.txt", &"x".repeat(40), 0.9, 1),
        candidate("b:0", "b.txt", &"y".repeat(400), 0.8, 2),
        candidate("c:0", "c.txt", "z", 0.7, 3),
    ];
    let block = compress(&fused, 100);
    assert_eq!(block.len(), 1, "a later short chunk does not jump the queue");
    assert!(!block.segments[0].truncated);
}

#[test]
fn oversized_first_candidate_is_truncated_not_dropped() {
    let fused = vec![candidate("a:0", "a.txt", &"x".repeat(500), 0.9, 1)];
    let block = compress(&fused, 120);
    assert_eq!(block.len(), 1);
    assert!(block.segments[0].truncated);
    assert_eq!(block.char_len(), 120);
}

#[test]
fn empty_survivors_make_empty_block() {
    let block = compress(&[], 100);
    assert!(block.is_empty());
    assert_eq!(block.render(), "");
}

proptest! {
    #[test]
    fn raising_threshold_never_adds_survivors(
        relevances in prop::collection::vec(0.0f32..1.0, 0..20),
        lo in 0.0f64..1.0,
        delta in 0.0f64..1.0,
        rerank_k in 1usize..10,
    ) {
        let fused = ranked(&relevances);
        let loose = filter_relevant(&fused, lo, rerank_k, RelevanceBasis::Similarity);
        let strict = filter_relevant(&fused, lo + delta, rerank_k, RelevanceBasis::Similarity);
        prop_assert!(strict.len() <= loose.len());
    }

    #[test]
    fn raising_rerank_k_never_removes_survivors(
        relevances in prop::collection::vec(0.0f32..1.0, 0..20),
        threshold in 0.0f64..1.0,
        k in 0usize..10,
        extra in 0usize..10,
    ) {
        let fused = ranked(&relevances);
        let small = filter_relevant(&fused, threshold, k, RelevanceBasis::Similarity);
        let large = filter_relevant(&fused, threshold, k + extra, RelevanceBasis::Similarity);
        prop_assert!(small.len() <= large.len());
        let prefix: Vec<&str> = large[..small.len()].iter().map(|c| c.chunk.id.as_str()).collect();
        let kept: Vec<&str> = small.iter().map(|c| c.chunk.id.as_str()).collect();
        prop_assert_eq!(prefix, kept);
        prop_assert!(small.len() <= k);
    }

    #[test]
    fn context_respects_budget_and_order(
        lengths in prop::collection::vec(1usize..300, 1..12),
        max_chars in 40usize..2000,
    ) {
        let fused: Vec<FusedCandidate> = lengths
            .iter()
            .enumerate()
            .map(|(i, len)| candidate(&format!("c{i}"), &format!("doc{i}.txt"), &"w".repeat(*len), 0.9, i + 1))
            .collect();
        let block = compress(&fused, max_chars);

        prop_assert!(!block.is_empty());
        prop_assert!(block.char_len() <= max_chars);
        prop_assert_eq!(block.render().chars().count(), block.char_len());
        for (segment, original) in block.segments.iter().zip(&fused) {
            prop_assert_eq!(&segment.chunk_id, &original.chunk.id);
        }
        let header = ContextSegment::header_chars("doc0.txt");
        if header + lengths[0] > max_chars {
            prop_assert_eq!(block.len(), 1);
            prop_assert!(block.segments[0].truncated);
        }
    }
}
