use std::fs;
use std::io::Write;
use tempfile::TempDir;

use docqa_core::config::{Config, PipelineConfig, RelevanceBasis};
use docqa_core::data_processor::{ChunkingConfig, DataProcessor};
use docqa_core::types::{ContextBlock, ContextSegment};

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let processor = DataProcessor::new();
    let batch = processor.process_directory(dir).expect("process");

    assert_eq!(batch.chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(batch.chunks[0].content.trim(), "Short text");
    assert_eq!(batch.chunks[0].id, "a.txt:0");
    assert_eq!(batch.chunks[0].doc_name, "a.txt");
}

#[test]
fn unsupported_and_oversized_files_are_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("notes.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("scan.png"), [0u8, 1, 2]).unwrap();
    fs::write(dir.join("big.md"), "x ".repeat(2048)).unwrap();

    let processor = DataProcessor::with_config(ChunkingConfig { max_file_mb: 0, ..ChunkingConfig::default() });
    let batch = processor.process_directory(dir).expect("process");
    assert!(batch.chunks.is_empty(), "every file is refused with a zero size limit");
    assert!(batch.skipped.iter().any(|s| s == "scan.png (unsupported)"));
    assert!(batch.skipped.iter().any(|s| s == "big.md (>0MB)"));

    let batch = DataProcessor::new().process_directory(dir).expect("process");
    assert_eq!(batch.document_count(), 2);
    assert_eq!(batch.skipped, vec!["scan.png (unsupported)".to_string()]);
}

#[test]
fn paragraphs_pack_until_token_budget() {
    let processor = DataProcessor::with_config(ChunkingConfig { max_tokens: 8, overlap_tokens: 0, ..ChunkingConfig::default() });
    // 3 words ~ 4 tokens each: two paragraphs fit, the third starts a new chunk
    let text = "one two three\n\nfour five six\n\nseven eight nine";
    let chunks = processor.chunk_text("doc.txt", "/tmp/doc.txt", text);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "one two three\n\nfour five six");
    assert_eq!(chunks[1].content, "seven eight nine");
    assert!(chunks.iter().all(|c| c.total_chunks == 2));
    assert_eq!(chunks[1].chunk_index, 1);
}

#[test]
fn oversized_paragraph_splits_with_overlap() {
    let processor = DataProcessor::with_config(ChunkingConfig { max_tokens: 8, overlap_tokens: 4, ..ChunkingConfig::default() });
    // 6 words per window, 3 words overlap
    let words: Vec<String> = (0..12).map(|i| format!("w{i}")).collect();
    let chunks = processor.chunk_text("doc.txt", "doc.txt", &words.join(" "));
    assert_eq!(chunks[0].content, "w0 w1 w2 w3 w4 w5");
    assert_eq!(chunks[1].content, "w3 w4 w5 w6 w7 w8");
    assert_eq!(chunks.last().unwrap().content.split_whitespace().last(), Some("w11"));
}

#[test]
fn packed_chunks_overlap_with_previous_chunk() {
    let processor = DataProcessor::with_config(ChunkingConfig { max_tokens: 12, overlap_tokens: 4, ..ChunkingConfig::default() });
    // 4 words ~ 5 tokens per paragraph; 3 words of overlap carried forward
    let text = "a1 a2 a3 a4\n\nb1 b2 b3 b4\n\nc1 c2 c3 c4";
    let chunks = processor.chunk_text("doc.txt", "doc.txt", text);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "a1 a2 a3 a4\n\nb1 b2 b3 b4");
    assert_eq!(chunks[1].content, "b2 b3 b4\n\nc1 c2 c3 c4");
}

#[test]
fn carried_tail_shrinks_to_fit_next_paragraph() {
    let processor = DataProcessor::with_config(ChunkingConfig { max_tokens: 12, overlap_tokens: 4, ..ChunkingConfig::default() });
    // second paragraph is 7 words ~ 9 tokens, leaving room for 2 carried words
    let text = "a1 a2 a3 a4 a5 a6\n\nb1 b2 b3 b4 b5 b6 b7";
    let chunks = processor.chunk_text("doc.txt", "doc.txt", text);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].content, "a5 a6\n\nb1 b2 b3 b4 b5 b6 b7");
    assert!(chunks.iter().all(|c| docqa_core::data_processor::count_tokens(&c.content) <= 12));
}

#[test]
fn context_block_length_counts_tags_and_separators() {
    let mut block = ContextBlock::new(1000);
    block.push(ContextSegment::new("a.pdf", "a.pdf:0", "alpha"));
    block.push(ContextSegment::new("b.pdf", "b.pdf:0", "beta"));
    block.push(ContextSegment::new("a.pdf", "a.pdf:1", "gamma"));
    let rendered = block.render();
    assert_eq!(rendered.chars().count(), block.char_len());
    assert!(rendered.starts_with("[Source: a.pdf]\nalpha\n\n---\n\n[Source: b.pdf]\nbeta"));
    assert_eq!(block.sources(), vec!["a.pdf".to_string(), "b.pdf".to_string()]);
}

#[test]
fn config_files_merge_with_env_specific_overrides() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[pipeline]\ntop_k = 20\nrerank_k = 5\n\n[store]\npath = \"idx/store.json\"\n").unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[pipeline]\nrerank_k = 3\nrelevance_basis = \"fused\"\nmin_relevance = 0.01\n").unwrap();

    let config = Config::load_for_env(tmp.path(), "test").expect("load");
    let pipeline = config.pipeline().expect("pipeline");
    assert_eq!(pipeline.top_k, 20);
    assert_eq!(pipeline.rerank_k, 3);
    assert_eq!(pipeline.relevance_basis, RelevanceBasis::Fused);
    assert_eq!(pipeline.rrf_k, 60, "unset fields keep defaults");

    let store = config.store().expect("store");
    assert_eq!(store.resolved_path(tmp.path()), tmp.path().join("idx/store.json"));
    assert_eq!(config.llm().expect("llm").generation_model, "gemini-2.5-pro");
}

#[test]
fn invalid_pipeline_config_is_rejected_at_load() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[pipeline]\nmmr_lambda = 1.5\n").unwrap();
    assert!(Config::load_for_env(tmp.path(), "dev").is_err());

    fs::write(tmp.path().join("config.toml"), "[pipeline]\nsentence_check = false\n").unwrap();
    assert!(Config::load_for_env(tmp.path(), "dev").is_ok());
    assert!(Config::load_for_env(tmp.path(), "prod").is_err());
}

#[test]
fn fused_threshold_above_best_possible_score_is_invalid() {
    let cfg = PipelineConfig { relevance_basis: RelevanceBasis::Fused, min_relevance: 0.35, ..PipelineConfig::default() };
    assert!(cfg.validate().is_err());
    let cfg = PipelineConfig { relevance_basis: RelevanceBasis::Fused, min_relevance: 0.02, ..PipelineConfig::default() };
    assert!(cfg.validate().is_ok());
    assert!(PipelineConfig::default().validate().is_ok());
}
