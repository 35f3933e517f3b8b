use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text of one non-empty PDF page, tagged with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub text: String,
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub text: String,
    pub source: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f64,
    pub metadata: Option<VectorMetadata>,
}

impl QueryMatch {
    pub fn text(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.text.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl Metric {
    pub fn pinecone_name(self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dotproduct",
        }
    }

    pub fn qdrant_name(self) -> &'static str {
        match self {
            Metric::Cosine => "Cosine",
            Metric::Euclidean => "Euclid",
            Metric::DotProduct => "Dot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            name: "association-docs".to_string(),
            dimension: crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS,
            metric: Metric::Cosine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndexStats {
    pub total_vector_count: u64,
    pub dimension: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionPolicy {
    /// Any unreadable PDF fails the whole run.
    #[default]
    Abort,
    /// Unreadable PDFs are reported and the rest of the folder is indexed.
    SkipUnreadable,
}

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct IndexingReport {
    pub files: usize,
    pub pages: usize,
    pub vectors: usize,
    pub batches: usize,
    pub skipped_files: Vec<SkippedPdf>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub matches: Vec<QueryMatch>,
    pub usage: Option<TokenUsage>,
}
