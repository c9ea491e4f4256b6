//! A model-free `Generator` for offline use.
//!
//! Drafts are the context sentences sharing the most content terms with the
//! question; validation echoes the draft and leaves grounding to the
//! sentence check.

use async_trait::async_trait;

use docqa_core::text::{content_terms, split_sentences, term_coverage};
use docqa_core::traits::Generator;
use docqa_core::types::{ContextBlock, SOURCE_TAG_OPEN};
use docqa_core::{Error, Result};

use crate::prompts::{parse_prompt, UNSUPPORTED_MARKER};

#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self { max_sentences: 3 }
    }
}

impl ExtractiveGenerator {
    pub fn new(max_sentences: usize) -> Self {
        Self { max_sentences: max_sentences.max(1) }
    }

    fn extract(&self, context: &str, question: &str) -> String {
        let wanted = content_terms(question);
        let mut scored: Vec<(f32, usize, &str)> = Vec::new();
        let mut position = 0usize;
        for segment in context.split(ContextBlock::SEPARATOR) {
            for line in segment.lines().filter(|l| !l.starts_with(SOURCE_TAG_OPEN)) {
                for sentence in split_sentences(line) {
                    let score = term_coverage(&wanted, &content_terms(sentence));
                    if score > 0.0 {
                        scored.push((score, position, sentence));
                    }
                    position += 1;
                }
            }
        }
        if scored.is_empty() {
            return UNSUPPORTED_MARKER.to_string();
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(self.max_sentences);
        scored.sort_by_key(|s| s.1);
        scored.iter().map(|s| s.2).collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let parts = parse_prompt(prompt).ok_or_else(|| Error::Generation("prompt has no context section".to_string()))?;
        Ok(match parts.draft {
            Some(draft) => draft.trim().to_string(),
            None => self.extract(parts.context, parts.question),
        })
    }
}
