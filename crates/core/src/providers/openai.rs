//! OpenAI-compatible embedding and chat completion clients.

use crate::chat::ChatModel;
use crate::embeddings::Embedder;
use crate::error::ModelError;
use crate::models::{Completion, TokenUsage};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

fn build_client(api_key: &str, timeout: Duration) -> Result<Client, ModelError> {
    if api_key.trim().is_empty() {
        return Err(ModelError::InvalidInput("missing OpenAI API key".to_string()));
    }

    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| ModelError::InvalidInput("invalid OpenAI API key".to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

async fn error_body(service: &'static str, response: reqwest::Response) -> ModelError {
    let status = response.status().as_u16();
    let details = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    ModelError::BackendResponse {
        service,
        status,
        details,
    }
}

/// Embeddings client for one model, one input per request.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

fn single_embedding(response: EmbeddingResponse, dimensions: usize) -> Result<Vec<f32>, ModelError> {
    let embedding = response
        .data
        .into_iter()
        .min_by_key(|entry| entry.index)
        .map(|entry| entry.embedding)
        .ok_or_else(|| ModelError::MalformedResponse("no embedding in response".to_string()))?;

    if embedding.len() != dimensions {
        return Err(ModelError::DimensionMismatch {
            expected: dimensions,
            actual: embedding.len(),
        });
    }

    Ok(embedding)
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        debug!(model = %self.model, chars = text.len(), "requesting embedding");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_body("embeddings", response).await);
        }

        let parsed: EmbeddingResponse = response.json().await?;
        single_embedding(parsed, self.dimensions)
    }
}

#[derive(Clone)]
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_completion(response: ChatResponse) -> Result<Completion, ModelError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::MalformedResponse("no choices in chat response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    Ok(Completion {
        text,
        usage: response.usage,
    })
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(error_body("chat completions", response).await);
        }

        let parsed: ChatResponse = response.json().await?;
        first_completion(parsed)
    }
}
