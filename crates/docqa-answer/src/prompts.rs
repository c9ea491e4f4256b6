//! Prompt templates for the draft and validation passes.
//!
//! Both prompts share the `Context:` / `Question:` layout so a prompt can be
//! taken apart again by [`parse_prompt`].

/// What the model must answer when the context does not support an answer.
pub const UNSUPPORTED_MARKER: &str = "No info in docs about the asked question.";

pub const CONTEXT_HEADER: &str = "Context:\n";
pub const QUESTION_HEADER: &str = "\n\nQuestion: ";
pub const DRAFT_HEADER: &str = "\n\nDraft Answer:\n";

const ANSWER_INSTRUCTIONS: &str = "You are a precise assistant that answers ONLY using the provided context. \
If the answer is not fully supported by the context, respond exactly: 'No info in docs about the asked question.' \
Answer in plain sentences and keep paragraphs short.";

const ANSWER_FOOTER: &str = "\n\nRules:\n\
- Use only facts stated in the context\n\
- Do not add file name citations like [filename]\n\
- Do not speculate beyond the context";

const VALIDATION_INSTRUCTIONS: &str = "Validate the following answer STRICTLY against the context. \
Remove any claims not supported by the context. \
If little is supported, reply: 'No info in docs about the asked question.'";

const VALIDATION_FOOTER: &str = "\n\nReturn ONLY the corrected final answer as plain sentences. \
Do not add file name citations like [filename].";

pub fn answer_prompt(question: &str, context: &str) -> String {
    format!("{ANSWER_INSTRUCTIONS}\n\n{CONTEXT_HEADER}{context}{QUESTION_HEADER}{question}{ANSWER_FOOTER}")
}

pub fn validation_prompt(question: &str, context: &str, draft: &str) -> String {
    format!("{VALIDATION_INSTRUCTIONS}\n\n{CONTEXT_HEADER}{context}{QUESTION_HEADER}{question}{DRAFT_HEADER}{draft}{VALIDATION_FOOTER}")
}

/// The variable parts of a prompt built by this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParts<'a> {
    pub context: &'a str,
    pub question: &'a str,
    /// Present for validation prompts only.
    pub draft: Option<&'a str>,
}

pub fn parse_prompt(prompt: &str) -> Option<PromptParts<'_>> {
    let context_start = prompt.find(CONTEXT_HEADER)? + CONTEXT_HEADER.len();
    let question_at = prompt.rfind(QUESTION_HEADER)?;
    if question_at < context_start {
        return None;
    }
    let context = &prompt[context_start..question_at];
    let rest = &prompt[question_at + QUESTION_HEADER.len()..];

    if let Some(draft_at) = rest.find(DRAFT_HEADER) {
        let question = &rest[..draft_at];
        let draft = &rest[draft_at + DRAFT_HEADER.len()..];
        let draft = draft.strip_suffix(VALIDATION_FOOTER).unwrap_or(draft);
        return Some(PromptParts { context, question, draft: Some(draft) });
    }
    let question = rest.strip_suffix(ANSWER_FOOTER).unwrap_or(rest);
    Some(PromptParts { context, question, draft: None })
}

/// True when `text` is the "not supported" marker, ignoring case, quoting
/// and trailing punctuation.
pub fn is_unsupported_marker(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_matches(|c: char| matches!(c, '\'' | '"' | '`' | '.' | '*') || c.is_whitespace())
        .to_lowercase();
    let marker = UNSUPPORTED_MARKER.trim_end_matches('.').to_lowercase();
    normalized == marker
}
