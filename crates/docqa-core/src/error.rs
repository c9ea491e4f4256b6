use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Chunk store unreachable, empty when it must not be, or malformed response.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Model call failed, timed out, or returned unusable output.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Failures that happen before or during candidate retrieval.
    ///
    /// The query embedding is a retrieval precondition, so embedding
    /// failures land here too.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Error::Retrieval(_) | Error::Embedding(_))
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, Error::Generation(_))
    }

    /// Re-tag any failure coming out of a model call as a generation failure.
    pub fn into_generation(self) -> Self {
        match self {
            Error::Generation(_) => self,
            other => Error::Generation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
