use crate::stores::{check_index_name, metadata_from_value, metadata_to_value};
use crate::traits::VectorStore;
use crate::{IndexSpec, IndexStats, QueryMatch, StoreError, VectorRecord};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

#[derive(Debug, Clone)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

impl Default for ServerlessSpec {
    fn default() -> Self {
        Self {
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// Serverless Pinecone index addressed by name.
///
/// The data-plane host is resolved from the control plane on first use.
pub struct PineconeStore {
    client: Client,
    controller: Url,
    index_name: String,
    serverless: ServerlessSpec,
    ready_timeout: Duration,
    host: OnceLock<Url>,
}

impl PineconeStore {
    pub fn new(
        api_key: &str,
        controller_url: &str,
        index_name: impl Into<String>,
        serverless: ServerlessSpec,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        if api_key.trim().is_empty() {
            return Err(StoreError::Request("missing Pinecone API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| StoreError::Request("invalid Pinecone API key".to_string()))?,
        );
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            controller: Url::parse(controller_url)?,
            index_name: index_name.into(),
            serverless,
            ready_timeout: Duration::from_secs(60),
            host: OnceLock::new(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn controller_url(&self, path: &str) -> Result<Url, StoreError> {
        Ok(self.controller.join(path)?)
    }

    /// `GET /indexes/{name}`; `None` when the index does not exist.
    async fn describe_index(&self) -> Result<Option<Value>, StoreError> {
        let response = self
            .client
            .get(self.controller_url(&format!("/indexes/{}", self.index_name))?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        Ok(Some(response.json().await?))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.controller_url("/indexes")?)
            .json(&json!({
                "name": self.index_name,
                "dimension": spec.dimension,
                "metric": spec.metric.pinecone_name(),
                "spec": {
                    "serverless": {
                        "cloud": self.serverless.cloud,
                        "region": self.serverless.region,
                    }
                }
            }))
            .send()
            .await?;

        // 409: created concurrently by another process.
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<Value, StoreError> {
        let deadline = tokio::time::Instant::now() + self.ready_timeout;
        loop {
            if let Some(description) = self.describe_index().await? {
                let ready = description
                    .pointer("/status/ready")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if ready {
                    return Ok(description);
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(StoreError::Request(format!(
                    "index {} not ready after {:?}",
                    self.index_name, self.ready_timeout
                )));
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    fn remember_host(&self, description: &Value) -> Result<Url, StoreError> {
        let host = description
            .pointer("/host")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: "pinecone".to_string(),
                details: "index description has no host".to_string(),
            })?;
        let url = parse_host(host)?;
        Ok(self.host.get_or_init(|| url).clone())
    }

    async fn data_plane(&self, path: &str) -> Result<Url, StoreError> {
        let host = match self.host.get() {
            Some(host) => host.clone(),
            None => {
                let description = self.describe_index().await?.ok_or_else(|| {
                    StoreError::Request(format!("index {} does not exist", self.index_name))
                })?;
                self.remember_host(&description)?
            }
        };
        Ok(host.join(path)?)
    }

    async fn post_data(&self, path: &str, body: &Value) -> Result<Value, StoreError> {
        let url = self.data_plane(path).await?;
        let response = self.client.post(url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(response.json().await?)
    }
}

fn parse_host(host: &str) -> Result<Url, StoreError> {
    if host.starts_with("http://") || host.starts_with("https://") {
        Ok(Url::parse(host)?)
    } else {
        Ok(Url::parse(&format!("https://{host}"))?)
    }
}

async fn backend_error(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    StoreError::BackendResponse {
        backend: "pinecone".to_string(),
        details: format!("{status}: {body}"),
    }
}

fn parse_matches(parsed: &Value) -> Vec<QueryMatch> {
    parsed
        .pointer("/matches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .map(|hit| QueryMatch {
                    id: hit
                        .pointer("/id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                    metadata: hit.pointer("/metadata").and_then(metadata_from_value),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_stats(parsed: &Value) -> IndexStats {
    IndexStats {
        total_vector_count: parsed
            .pointer("/totalVectorCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        dimension: parsed
            .pointer("/dimension")
            .and_then(Value::as_u64)
            .map(|dimension| dimension as usize),
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        check_index_name(&self.index_name, spec)?;
        let description = match self.describe_index().await? {
            Some(description) => description,
            None => {
                info!(index = %spec.name, dimension = spec.dimension, "creating pinecone index");
                self.create_index(spec).await?;
                self.wait_until_ready().await?
            }
        };

        let dimension = description
            .pointer("/dimension")
            .and_then(Value::as_u64)
            .map(|dimension| dimension as usize);
        if let Some(dimension) = dimension {
            if dimension != spec.dimension {
                return Err(StoreError::Request(format!(
                    "index {} has dimension {}, expected {}",
                    spec.name, dimension, spec.dimension
                )));
            }
        }

        self.remember_host(&description)?;
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "values": record.values,
                    "metadata": metadata_to_value(&record.metadata),
                })
            })
            .collect::<Vec<_>>();

        let parsed = self
            .post_data("/vectors/upsert", &json!({ "vectors": vectors }))
            .await?;
        debug!(
            upserted = ?parsed.pointer("/upsertedCount").and_then(serde_json::Value::as_u64),
            "pinecone upsert"
        );
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError> {
        let parsed = self
            .post_data(
                "/query",
                &json!({
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                    "includeValues": false,
                }),
            )
            .await?;
        Ok(parse_matches(&parsed))
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        let parsed = self.post_data("/describe_index_stats", &json!({})).await?;
        Ok(parse_stats(&parsed))
    }
}
