use serde::{Deserialize, Serialize};

use docqa_core::types::Chunk;
use docqa_core::{Error, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of a [`crate::MemoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub dim: Option<usize>,
    pub chunks: Vec<Chunk>,
}

impl Snapshot {
    pub fn new(dim: Option<usize>, chunks: Vec<Chunk>) -> Self {
        Self { version: SNAPSHOT_VERSION, dim, chunks }
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::InvalidConfig(format!("unsupported snapshot version {}", self.version)));
        }
        match self.dim {
            None if !self.chunks.is_empty() => Err(Error::InvalidConfig("snapshot has chunks but no dimension".to_string())),
            Some(dim) => match self.chunks.iter().find(|c| c.embedding.len() != dim) {
                Some(bad) => Err(Error::InvalidConfig(format!("snapshot chunk {} does not match dimension {dim}", bad.id))),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }
}
