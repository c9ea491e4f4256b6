use std::sync::Arc;

use tracing::debug;

use docqa_core::traits::Generator;
use docqa_core::types::{Answer, ContextBlock};
use docqa_core::{Error, Result};

use crate::prompts::answer_prompt;

/// First model pass: a draft answer restricted to the compressed context.
pub struct AnswerGenerator {
    generator: Arc<dyn Generator>,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Any failure of the model call, and an empty reply, is a generation error.
    pub async fn draft(&self, question: &str, context: ContextBlock) -> Result<Answer> {
        let prompt = answer_prompt(question, &context.render());
        let text = self.generator.generate(&prompt).await.map_err(Error::into_generation)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Generation(format!("{} returned an empty draft", self.generator.model_name())));
        }
        debug!(model = self.generator.model_name(), draft_chars = text.chars().count(), "draft generated");
        Ok(Answer { text: text.to_string(), context })
    }
}
