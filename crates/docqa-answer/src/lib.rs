//! Question answering over stored document chunks: dual retrieval, a draft
//! from the model, a grounding pass, and deterministic fallbacks.

pub mod engine;
pub mod fallback;
pub mod generator;
pub mod offline;
pub mod prompts;
pub mod validator;

pub use engine::{confidence, QaEngine};
pub use fallback::{closest_documents, no_answer, no_documents, shorten_query, NO_DOCUMENTS_MESSAGE};
pub use generator::AnswerGenerator;
pub use offline::ExtractiveGenerator;
pub use prompts::{is_unsupported_marker, UNSUPPORTED_MARKER};
pub use validator::{interpret, SentenceCheck, Validator};
