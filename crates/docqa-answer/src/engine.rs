use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use docqa_core::config::PipelineConfig;
use docqa_core::traits::{ChunkStore, Embedder, Generator};
use docqa_core::types::{AnswerOutcome, ContextBlock, FusedCandidate, OutcomeKind};
use docqa_core::{Error, Result};
use docqa_retrieval::{compress, DualRetriever};

use crate::fallback::{closest_documents, no_answer, no_documents};
use crate::generator::AnswerGenerator;
use crate::prompts::is_unsupported_marker;
use crate::validator::{SentenceCheck, Validator};

/// One question in, one outcome out.
///
/// Holds the read-only store and the model handles; no state is carried
/// between calls, so one engine can serve concurrent questions.
pub struct QaEngine {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    answerer: AnswerGenerator,
    validator: Validator,
    config: PipelineConfig,
}

impl QaEngine {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let check = SentenceCheck { enabled: config.sentence_check, min_support: config.min_sentence_support };
        Ok(Self {
            store,
            embedder,
            answerer: AnswerGenerator::new(Arc::clone(&generator)),
            validator: Validator::new(generator, check),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer `query` from the stored documents.
    ///
    /// Returns exactly one of: a grounded answer with its source, the
    /// no-documents message, or the no-answer message. Retrieval and
    /// generation failures abort the cycle as `Err`, as does a blank
    /// question against a non-empty store.
    pub async fn answer_question(&self, query: &str) -> Result<AnswerOutcome> {
        let started = Instant::now();
        debug!(query, "answering question");

        // An empty store answers every question, blank ones included.
        let stored = self.store.len().await.map_err(as_retrieval)?;
        if stored == 0 {
            info!("store is empty, no documents to answer from");
            return Ok(no_documents());
        }

        // Fallback messages echo the question as asked; the pipeline sees it trimmed.
        let asked = query;
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery("question is empty".to_string()));
        }

        let query_embedding = self.embedder.embed(query).await.map_err(as_retrieval)?;
        let retriever = DualRetriever::new(self.store.as_ref(), &self.config);
        let retrieved = retriever.retrieve(&query_embedding).await?;
        let survivors = retriever.survivors(&retrieved.fused);
        debug!(fused = retrieved.fused.len(), survivors = survivors.len(), "filtered candidates");

        if survivors.is_empty() {
            let closest = closest_documents(&ContextBlock::new(self.config.context_max_chars), &retrieved.fused, self.config.closest_docs_k);
            return Ok(self.finish(no_answer(asked, closest, self.config.query_display_chars), started));
        }

        let context = compress(&survivors, self.config.context_max_chars);
        let draft = self.answerer.draft(query, context).await?;
        if is_unsupported_marker(&draft.text) {
            debug!("draft reports unsupported question, skipping validation");
            let closest = closest_documents(&draft.context, &retrieved.fused, self.config.closest_docs_k);
            return Ok(self.finish(no_answer(asked, closest, self.config.query_display_chars), started));
        }

        let validation = self.validator.validate(query, &draft).await?;
        if !validation.grounded {
            let closest = closest_documents(&draft.context, &retrieved.fused, self.config.closest_docs_k);
            return Ok(self.finish(no_answer(asked, closest, self.config.query_display_chars), started));
        }

        let outcome = AnswerOutcome {
            answer_text: validation.answer_text,
            source: validation.source,
            grounded: true,
            kind: OutcomeKind::Grounded,
            confidence: confidence(&survivors),
            closest_documents: draft.context.sources(),
        };
        Ok(self.finish(outcome, started))
    }

    fn finish(&self, outcome: AnswerOutcome, started: Instant) -> AnswerOutcome {
        info!(
            kind = ?outcome.kind,
            source = ?outcome.source,
            confidence = outcome.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );
        outcome
    }
}

/// Mean survivor similarity clipped to [0, 1], rounded to three decimals.
pub fn confidence(survivors: &[FusedCandidate]) -> f32 {
    if survivors.is_empty() {
        return 0.0;
    }
    let sum: f32 = survivors.iter().map(|c| c.relevance.clamp(0.0, 1.0)).sum();
    let mean = sum / survivors.len() as f32;
    (mean * 1000.0).round() / 1000.0
}

fn as_retrieval(err: Error) -> Error {
    if err.is_retrieval() {
        err
    } else {
        Error::Retrieval(err.to_string())
    }
}
