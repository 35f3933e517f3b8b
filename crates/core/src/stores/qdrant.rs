use crate::stores::{check_index_name, metadata_from_value, metadata_to_value};
use crate::traits::VectorStore;
use crate::{IndexSpec, IndexStats, QueryMatch, StoreError, VectorRecord};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key)
                    .map_err(|_| StoreError::Request("invalid Qdrant API key".to_string()))?,
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    async fn describe_collection(&self) -> Result<Option<Value>, StoreError> {
        let response = self.client.get(self.collection_url()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        Ok(Some(response.json().await?))
    }
}

fn backend_error(status: StatusCode) -> StoreError {
    StoreError::BackendResponse {
        backend: "qdrant".to_string(),
        details: status.to_string(),
    }
}

/// Qdrant only accepts unsigned integers or UUIDs as point ids.
fn point_id(record_id: &str) -> Result<String, StoreError> {
    Uuid::parse_str(record_id)
        .map(|id| id.to_string())
        .map_err(|error| StoreError::Request(format!("id {record_id} is not a uuid: {error}")))
}

fn parse_hits(parsed: &Value) -> Vec<QueryMatch> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .map(|hit| {
            let id = hit
                .pointer("/payload/record_id")
                .or_else(|| hit.pointer("/id"))
                .map(|id| match id.as_str() {
                    Some(text) => text.to_string(),
                    None => id.to_string(),
                })
                .unwrap_or_default();
            QueryMatch {
                id,
                score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                metadata: hit.pointer("/payload").and_then(metadata_from_value),
            }
        })
        .collect()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        check_index_name(&self.collection, spec)?;
        if let Some(description) = self.describe_collection().await? {
            let size = description
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64);
            if let Some(size) = size {
                if size as usize != spec.dimension {
                    return Err(StoreError::Request(format!(
                        "configured vector size {} does not match requested {}",
                        size, spec.dimension
                    )));
                }
            }
            return Ok(());
        }

        info!(collection = %self.collection, dimension = spec.dimension, "creating qdrant collection");
        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": spec.dimension,
                    "distance": spec.metric.qdrant_name(),
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() && response.status() != StatusCode::CONFLICT {
            return Err(backend_error(response.status()));
        }
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        let points = records
            .iter()
            .map(|record| {
                let mut payload = metadata_to_value(&record.metadata);
                payload["record_id"] = json!(record.id);
                Ok(json!({
                    "id": point_id(&record.id)?,
                    "vector": record.values,
                    "payload": payload,
                }))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError> {
        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        Ok(parse_hits(&parsed))
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let description = self.describe_collection().await?.ok_or_else(|| {
            StoreError::Request(format!("collection {} does not exist", self.collection))
        })?;

        Ok(IndexStats {
            total_vector_count: description
                .pointer("/result/points_count")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            dimension: description
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64)
                .map(|size| size as usize),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_id;

    #[test]
    fn vector_ids_convert_to_uuids() -> Result<(), StoreError> {
        let id = vector_id("bylaws.pdf", 1, 0);
        let point = point_id(&id)?;
        assert_eq!(point.replace('-', ""), id);
        assert!(point_id("not-a-uuid").is_err());
        Ok(())
    }

    #[test]
    fn hits_prefer_the_stored_record_id() {
        let parsed = json!({
            "result": [
                {
                    "id": "3f2a6c1e-0000-0000-0000-000000000000",
                    "score": 0.8,
                    "payload": {"text": "Board meets monthly.", "source": "rules.pdf", "page": 4, "record_id": "abc"}
                },
                {"id": 7, "score": 0.1, "payload": {"text": "Other.", "source": "rules.pdf", "page": 1}}
            ]
        });

        let hits = parse_hits(&parsed);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "abc");
        assert_eq!(hits[0].text(), "Board meets monthly.");
        assert_eq!(hits[1].id, "7");
    }

    #[tokio::test]
    async fn ensure_index_rejects_a_different_collection() -> Result<(), StoreError> {
        let store = QdrantStore::new("http://127.0.0.1:9", "association-docs", None, Duration::from_secs(1))?;
        let spec = IndexSpec {
            name: "other-docs".to_string(),
            ..IndexSpec::default()
        };

        let result = store.ensure_index(&spec).await;

        assert!(matches!(result, Err(StoreError::Request(_))));
        Ok(())
    }
}
