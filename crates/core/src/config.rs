use crate::chunking::ChunkingConfig;
use crate::providers::openai::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use crate::retry::RetryPolicy;
use crate::store::DEFAULT_UPSERT_BATCH_SIZE;
use crate::{ExtractionPolicy, IndexSpec, PipelineError};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TOP_K: usize = 3;

/// Everything the pipelines need, built once at process start and passed by reference.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub system_prompt: String,
    pub request_timeout: Duration,
    pub docs_folder: PathBuf,
    pub index: IndexSpec,
    pub chunking: ChunkingConfig,
    pub upsert_batch_size: usize,
    pub default_top_k: usize,
    pub retry: RetryPolicy,
    pub extraction_policy: ExtractionPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: crate::chat::DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout: Duration::from_secs(60),
            docs_folder: PathBuf::from("docs"),
            index: IndexSpec::default(),
            chunking: ChunkingConfig::default(),
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
            default_top_k: DEFAULT_TOP_K,
            retry: RetryPolicy::default(),
            extraction_policy: ExtractionPolicy::default(),
        }
    }
}

impl RagConfig {
    /// Checks the settings that pipelines cannot recover from later.
    pub fn validate(&self) -> Result<(), PipelineError> {
        Url::parse(&self.openai_base_url)
            .map_err(|error| PipelineError::Config(format!("openai base url: {error}")))?;

        let checks = [
            (self.openai_api_key.trim().is_empty(), "openai api key is empty"),
            (self.index.name.trim().is_empty(), "index name is empty"),
            (self.index.dimension == 0, "index dimension must be positive"),
            (self.chunking.chunk_words == 0, "chunk size must be positive"),
            (self.upsert_batch_size == 0, "upsert batch size must be positive"),
            (self.default_top_k == 0, "top k must be positive"),
            (self.retry.max_attempts == 0, "retry attempts must be positive"),
            (self.system_prompt.trim().is_empty(), "system prompt is empty"),
        ];
        if let Some((_, message)) = checks.iter().find(|(failed, _)| *failed) {
            return Err(PipelineError::Config((*message).to_string()));
        }

        Ok(())
    }
}
