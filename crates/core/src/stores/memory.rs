use crate::traits::VectorStore;
use crate::{IndexSpec, IndexStats, QueryMatch, StoreError, VectorRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Brute-force in-process store standing in for a remote index.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    spec: Option<IndexSpec>,
    creations: usize,
    records: BTreeMap<String, VectorRecord>,
    upsert_sizes: Vec<usize>,
}

impl MemoryStore {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Request("memory store lock poisoned".to_string()))
    }

    /// How many times `ensure_index` actually created the index.
    pub fn creations(&self) -> usize {
        self.state().map(|state| state.creations).unwrap_or_default()
    }

    /// Size of every upsert request received, in order.
    pub fn upsert_sizes(&self) -> Vec<usize> {
        self.state()
            .map(|state| state.upsert_sizes.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.state().ok().and_then(|state| state.records.get(id).cloned())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if let Some(existing) = &state.spec {
            if existing.dimension != spec.dimension {
                return Err(StoreError::Request(format!(
                    "index {} has dimension {}, expected {}",
                    existing.name, existing.dimension, spec.dimension
                )));
            }
            return Ok(());
        }

        state.spec = Some(spec.clone());
        state.creations += 1;
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let dimension = state
            .spec
            .as_ref()
            .map(|spec| spec.dimension)
            .ok_or_else(|| StoreError::Request("index does not exist".to_string()))?;

        if let Some(bad) = records.iter().find(|record| record.values.len() != dimension) {
            return Err(StoreError::Request(format!(
                "vector {} has dimension {} != {}",
                bad.id,
                bad.values.len(),
                dimension
            )));
        }

        for record in records {
            state.records.insert(record.id.clone(), record.clone());
        }
        state.upsert_sizes.push(records.len());
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError> {
        let state = self.state()?;
        let mut matches = state
            .records
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: Some(record.metadata.clone()),
            })
            .collect::<Vec<_>>();

        matches.sort_by(|left, right| right.score.total_cmp(&left.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let state = self.state()?;
        Ok(IndexStats {
            total_vector_count: state.records.len() as u64,
            dimension: state.spec.as_ref().map(|spec| spec.dimension),
        })
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let (mut dot, mut left_norm, mut right_norm) = (0f64, 0f64, 0f64);
    for (a, b) in left.iter().zip(right) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Metric, VectorMetadata};

    fn spec(dimension: usize) -> IndexSpec {
        IndexSpec {
            name: "docs".to_string(),
            dimension,
            metric: Metric::Cosine,
        }
    }

    #[tokio::test]
    async fn ensure_index_creates_once() -> Result<(), StoreError> {
        let store = MemoryStore::default();
        store.ensure_index(&spec(2)).await?;
        store.ensure_index(&spec(2)).await?;
        assert_eq!(store.creations(), 1);
        assert!(store.ensure_index(&spec(3)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn upsert_replaces_existing_ids() -> Result<(), StoreError> {
        let store = MemoryStore::default();
        store.ensure_index(&spec(2)).await?;
        let mut record = VectorRecord {
            id: "abc".to_string(),
            values: vec![1.0, 0.0],
            metadata: VectorMetadata {
                text: "old".to_string(),
                source: "a.pdf".to_string(),
                page: 1,
            },
        };
        store.upsert(std::slice::from_ref(&record)).await?;
        record.metadata.text = "new".to_string();
        store.upsert(std::slice::from_ref(&record)).await?;

        assert_eq!(store.stats().await?.total_vector_count, 1);
        assert_eq!(store.get("abc").map(|found| found.metadata.text), Some("new".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn upsert_before_index_exists_fails() {
        let store = MemoryStore::default();
        assert!(store.upsert(&[]).await.is_err());
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let score = cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]);
        assert!((score - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
