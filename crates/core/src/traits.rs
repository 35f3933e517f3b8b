use crate::{IndexSpec, IndexStats, QueryMatch, StoreError, VectorRecord};
use async_trait::async_trait;

/// Lifecycle of one named external vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the index only when no index of that name exists.
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StoreError>;

    /// Submits `records` as one request; existing ids are replaced.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError>;

    /// Up to `top_k` nearest records with their metadata, in store order.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError>;

    async fn stats(&self) -> Result<IndexStats, StoreError>;
}
