use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::Chunk;

/// A chunk of extracted text that has not been embedded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub doc_name: String,
    pub doc_path: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl DocumentChunk {
    pub fn into_chunk(self, embedding: Vec<f32>) -> Chunk {
        Chunk { id: self.id, doc_name: self.doc_name, text: self.content, embedding, position: self.chunk_index }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
    pub max_file_mb: u64,
    /// Accepted file extensions, lowercase, without the dot.
    pub extensions: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 800, overlap_tokens: 120, max_file_mb: 30, extensions: vec!["txt".to_string(), "md".to_string()] }
    }
}

/// Chunks produced from one ingestion request plus the files that were refused.
#[derive(Debug, Default)]
pub struct ProcessedBatch {
    pub chunks: Vec<DocumentChunk>,
    pub skipped: Vec<String>,
}

impl ProcessedBatch {
    pub fn document_count(&self) -> usize {
        let mut names: Vec<&str> = self.chunks.iter().map(|c| c.doc_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Walk `data_dir` and chunk every accepted file.
    pub fn process_directory(&self, data_dir: &Path) -> Result<ProcessedBatch> {
        let files = self.list_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no files found");
            return Ok(ProcessedBatch::default());
        }
        self.process_files(&files)
    }

    /// Chunk a mix of files and directories, reporting refused files instead of failing.
    pub fn process_paths(&self, paths: &[PathBuf]) -> Result<ProcessedBatch> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() { files.extend(self.list_files(path)); } else { files.push(path.clone()); }
        }
        self.process_files(&files)
    }

    fn process_files(&self, files: &[PathBuf]) -> Result<ProcessedBatch> {
        let mut batch = ProcessedBatch::default();
        for (file_index, file_path) in files.iter().enumerate() {
            let name = file_name(file_path);
            if let Some(reason) = self.refusal_reason(file_path)? {
                warn!(file = %name, %reason, "skipping file");
                batch.skipped.push(format!("{name} ({reason})"));
                continue;
            }
            debug!(file = %name, "processing file {}/{}", file_index + 1, files.len());
            let content = read_file_content(file_path)?;
            let chunks = self.chunk_text(&name, &file_path.to_string_lossy(), &content);
            if chunks.is_empty() {
                warn!(file = %name, "no text content");
                batch.skipped.push(format!("{name} (empty)"));
                continue;
            }
            batch.chunks.extend(chunks);
        }
        info!(files = files.len(), chunks = batch.chunks.len(), skipped = batch.skipped.len(), "processed files");
        Ok(batch)
    }

    fn refusal_reason(&self, file_path: &Path) -> Result<Option<String>> {
        let ext = file_path.extension().and_then(|s| s.to_str()).map(str::to_lowercase).unwrap_or_default();
        if !self.chunking_config.extensions.iter().any(|e| *e == ext) {
            return Ok(Some("unsupported".to_string()));
        }
        let size = fs::metadata(file_path)?.len();
        if size > self.chunking_config.max_file_mb * 1024 * 1024 {
            return Ok(Some(format!(">{}MB", self.chunking_config.max_file_mb)));
        }
        Ok(None)
    }

    /// Pack paragraphs into chunks of at most `max_tokens`, splitting oversized
    /// paragraphs into word windows. Every chunk after the first starts with
    /// the last `overlap_tokens` worth of words of the chunk before it.
    pub fn chunk_text(&self, doc_name: &str, doc_path: &str, content: &str) -> Vec<DocumentChunk> {
        let normalized = content.replace("\r\n", "\n");
        let max_tokens = self.chunking_config.max_tokens.max(1);
        let (_, overlap_words) = self.window_words();
        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        // `current` holds only the tail carried over from the previous chunk
        let mut carried = false;
        for paragraph in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            let tokens = count_tokens(paragraph);
            if tokens > max_tokens {
                if !current.is_empty() && !carried { pieces.push(std::mem::take(&mut current)); }
                let lead = pieces.last().map(|p| tail_words(p, overlap_words)).unwrap_or_default();
                let text = if lead.is_empty() { paragraph.to_string() } else { format!("{lead} {paragraph}") };
                pieces.extend(self.split_paragraph_with_overlap(&text));
                (current, carried) = carry_over(&pieces, overlap_words);
                continue;
            }
            let words = paragraph.split_whitespace().count();
            if !current.is_empty() && !carried && tokens_for_words(current.split_whitespace().count() + words) > max_tokens {
                pieces.push(std::mem::take(&mut current));
                (current, carried) = carry_over(&pieces, overlap_words);
            }
            if carried { current = fit_tail(&current, words, max_tokens); }
            if !current.is_empty() { current.push_str("\n\n"); }
            current.push_str(paragraph);
            carried = false;
        }
        if !current.is_empty() && !carried { pieces.push(current); }

        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| DocumentChunk {
                id: format!("{doc_name}:{chunk_index}"),
                doc_name: doc_name.to_string(),
                doc_path: doc_path.to_string(),
                content,
                chunk_index,
                total_chunks,
            })
            .collect()
    }

    /// Words per window and words of overlap, derived from the token settings.
    fn window_words(&self) -> (usize, usize) {
        let words_per_chunk = ((self.chunking_config.max_tokens as f32 * 0.75) as usize).max(1);
        let overlap_words = ((self.chunking_config.overlap_tokens as f32 * 0.75) as usize).min(words_per_chunk - 1);
        (words_per_chunk, overlap_words)
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let (words_per_chunk, overlap_words) = self.window_words();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }
}

/// Rough token estimate: ~0.75 words per token.
pub fn count_tokens(text: &str) -> usize {
    tokens_for_words(text.split_whitespace().count())
}

fn tokens_for_words(word_count: usize) -> usize {
    (word_count as f32 / 0.75) as usize
}

/// Last `n` words of `text`, single-space joined.
fn tail_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    words[words.len().saturating_sub(n)..].join(" ")
}

/// Start the next chunk with the tail of the last finished one.
fn carry_over(pieces: &[String], overlap_words: usize) -> (String, bool) {
    let tail = pieces.last().map(|p| tail_words(p, overlap_words)).unwrap_or_default();
    let carried = !tail.is_empty();
    (tail, carried)
}

/// Drop leading words of a carried tail until `paragraph_words` more still fit.
fn fit_tail(tail: &str, paragraph_words: usize, max_tokens: usize) -> String {
    let words: Vec<&str> = tail.split_whitespace().collect();
    let mut skip = 0;
    while skip < words.len() && tokens_for_words(words.len() - skip + paragraph_words) > max_tokens {
        skip += 1;
    }
    words[skip..].join(" ")
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn file_name(file_path: &Path) -> String {
    file_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| file_path.to_string_lossy().to_string())
}
