use crate::error::IngestError;
use sha2::{Digest, Sha256};

pub const DEFAULT_CHUNK_WORDS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_words: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_words: usize) -> Result<Self, IngestError> {
        if chunk_words == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be at least one word".to_string(),
            ));
        }
        Ok(Self { chunk_words })
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_words: DEFAULT_CHUNK_WORDS,
        }
    }
}

/// Regroups whitespace-separated words into consecutive chunks of `chunk_words`.
///
/// Sentence and paragraph boundaries are ignored; the last chunk may be shorter.
pub fn chunk_words(text: &str, chunk_words: usize) -> Vec<String> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    if chunk_words == 0 {
        return Vec::new();
    }

    words
        .chunks(chunk_words)
        .map(|group| group.join(" "))
        .collect()
}

/// Stable identifier for chunk `chunk_index` of `page` in `source`.
///
/// 32 lowercase hex characters, so it is accepted as an external id and parses
/// as a simple-format UUID.
pub fn vector_id(source: &str, page: u32, chunk_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{source}_p{page}_c{chunk_index}").as_bytes());
    let digest = hasher.finalize();
    digest[..16]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
