use std::sync::Arc;

use docqa_core::types::{Chunk, RetrievalCandidate, Strategy as Retriever};
use docqa_retrieval::{reciprocal_rank_fusion, rrf_contribution};
use proptest::prelude::*;

fn candidate(id: &str, rank: usize, strategy: Retriever) -> RetrievalCandidate {
    let chunk = Chunk { id: id.to_string(), doc_name: format!("{id}.txt"), text: id.to_string(), embedding: vec![1.0], position: 0 };
    RetrievalCandidate { chunk: Arc::new(chunk), score: 1.0 / rank as f32, relevance: 0.5, rank, strategy }
}

fn ranked(ids: &[&str], strategy: Retriever) -> Vec<RetrievalCandidate> {
    ids.iter().enumerate().map(|(i, id)| candidate(id, i + 1, strategy)).collect()
}

#[test]
fn fused_score_is_sum_of_reciprocal_ranks() {
    let sim = ranked(&["a", "b", "c"], Retriever::Similarity);
    let div = ranked(&["c", "d"], Retriever::Diversity);
    let fused = reciprocal_rank_fusion(&sim, &div, 60);

    let score = |id: &str| fused.iter().find(|f| f.chunk.id == id).map(|f| f.fused_score).unwrap();
    assert!((score("a") - 1.0 / 61.0).abs() < 1e-12);
    assert!((score("c") - (1.0 / 63.0 + 1.0 / 61.0)).abs() < 1e-12);
    assert!((score("d") - 1.0 / 62.0).abs() < 1e-12);
    assert_eq!(fused.len(), 4, "one fused candidate per distinct chunk");
    assert_eq!(fused[0].chunk.id, "c", "agreement between strategies wins");
    let ranks: Vec<usize> = fused.iter().map(|f| f.fused_rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

#[test]
fn rank_one_in_both_lists_beats_rank_one_in_one() {
    let sim = ranked(&["both", "sim_only"], Retriever::Similarity);
    let div = ranked(&["both"], Retriever::Diversity);
    let fused = reciprocal_rank_fusion(&sim, &div, 60);
    assert!(fused[0].fused_score > rrf_contribution(60, 1));
    assert_eq!(fused[0].chunk.id, "both");
    assert_eq!(fused[0].similarity_rank, Some(1));
    assert_eq!(fused[0].diversity_rank, Some(1));
}

#[test]
fn ties_break_on_similarity_rank_then_id() {
    // "x" is rank 2 in similarity only; "y" is rank 2 in diversity only: equal scores
    let sim = ranked(&["a", "x"], Retriever::Similarity);
    let div = ranked(&["b", "y"], Retriever::Diversity);
    let fused = reciprocal_rank_fusion(&sim, &div, 60);
    let order: Vec<&str> = fused.iter().map(|f| f.chunk.id.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "x", "y"]);

    // both absent from similarity: id decides
    let fused = reciprocal_rank_fusion(&[], &ranked(&["q", "p"], Retriever::Diversity), 60);
    assert_eq!(fused[0].chunk.id, "q");
    let fused = reciprocal_rank_fusion(&[], &[candidate("q", 1, Retriever::Diversity), candidate("p", 1, Retriever::Diversity)], 60);
    assert_eq!(fused[0].chunk.id, "q", "repeated ranks use list position");
}

#[test]
fn duplicate_within_one_list_counts_once() {
    let sim = ranked(&["a", "a", "b"], Retriever::Similarity);
    let fused = reciprocal_rank_fusion(&sim, &[], 60);
    assert_eq!(fused.len(), 2);
    assert!((fused[0].fused_score - 1.0 / 61.0).abs() < 1e-12);
}

fn id_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-h]", 0..8)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

proptest! {
    #[test]
    fn fusion_is_deterministic_and_matches_definition(sim_ids in id_list(), div_ids in id_list(), k in 1u32..100) {
        let sim_refs: Vec<&str> = sim_ids.iter().map(String::as_str).collect();
        let div_refs: Vec<&str> = div_ids.iter().map(String::as_str).collect();
        let sim = ranked(&sim_refs, Retriever::Similarity);
        let div = ranked(&div_refs, Retriever::Diversity);

        let first = reciprocal_rank_fusion(&sim, &div, k);
        let second = reciprocal_rank_fusion(&sim, &div, k);
        let ids = |v: &[docqa_core::types::FusedCandidate]| v.iter().map(|f| f.chunk.id.clone()).collect::<Vec<_>>();
        prop_assert_eq!(ids(&first[..]), ids(&second[..]));

        for f in &first {
            let expected = sim_ids.iter().position(|id| *id == f.chunk.id).map_or(0.0, |p| rrf_contribution(k, p + 1))
                + div_ids.iter().position(|id| *id == f.chunk.id).map_or(0.0, |p| rrf_contribution(k, p + 1));
            prop_assert!((f.fused_score - expected).abs() < 1e-12);
        }
        for pair in first.windows(2) {
            prop_assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }
}
