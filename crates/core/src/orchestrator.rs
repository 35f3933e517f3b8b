use crate::chat::ChatModel;
use crate::chunking::{chunk_words, vector_id};
use crate::config::RagConfig;
use crate::embeddings::{Embedder, RetryingEmbedder};
use crate::extractor::PdfExtractor;
use crate::ingest::load_pages;
use crate::query::{build_context, build_user_prompt};
use crate::retry::{Sleeper, TokioSleeper};
use crate::store::upsert_batched;
use crate::traits::VectorStore;
use crate::{Answer, IndexStats, IndexingReport, PipelineError, VectorMetadata, VectorRecord};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

/// Indexing and query pipelines over one embedder, one vector store and one chat model.
///
/// Only [`RagCoordinator::connect`] and [`RagCoordinator::connect_with_sleeper`] build a
/// coordinator, and they ensure the index exists first, so every other method can
/// assume the index is there.
pub struct RagCoordinator<E, S, C, Z = TokioSleeper>
where
    E: Embedder,
    S: VectorStore,
    C: ChatModel,
    Z: Sleeper,
{
    config: RagConfig,
    embedder: RetryingEmbedder<E, Z>,
    store: S,
    chat: C,
    extractor: Box<dyn PdfExtractor + Send + Sync>,
}

impl<E, S, C> RagCoordinator<E, S, C>
where
    E: Embedder,
    S: VectorStore,
    C: ChatModel,
{
    pub async fn connect(
        config: RagConfig,
        embedder: E,
        store: S,
        chat: C,
        extractor: Box<dyn PdfExtractor + Send + Sync>,
    ) -> Result<Self, PipelineError> {
        Self::connect_with_sleeper(config, embedder, store, chat, extractor, TokioSleeper).await
    }
}

impl<E, S, C, Z> RagCoordinator<E, S, C, Z>
where
    E: Embedder,
    S: VectorStore,
    C: ChatModel,
    Z: Sleeper,
{
    /// Like [`RagCoordinator::connect`], with embedding retries waiting on `sleeper`.
    pub async fn connect_with_sleeper(
        config: RagConfig,
        embedder: E,
        store: S,
        chat: C,
        extractor: Box<dyn PdfExtractor + Send + Sync>,
        sleeper: Z,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if embedder.dimensions() != config.index.dimension {
            return Err(PipelineError::Config(format!(
                "embedder produces {} dimensions but index {} expects {}",
                embedder.dimensions(),
                config.index.name,
                config.index.dimension
            )));
        }

        store.ensure_index(&config.index).await?;
        info!(index = %config.index.name, dimension = config.index.dimension, "vector index ready");

        Ok(Self {
            embedder: RetryingEmbedder::with_sleeper(embedder, config.retry, sleeper),
            config,
            store,
            chat,
            extractor,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chat(&self) -> &C {
        &self.chat
    }

    /// Re-indexes the configured document folder.
    pub async fn index_documents(&self) -> Result<IndexingReport, PipelineError> {
        let folder = self.config.docs_folder.clone();
        self.index_folder(&folder).await
    }

    /// Loads, chunks and embeds every PDF in `folder`, then upserts in batches.
    ///
    /// Any embedding failure aborts before the first upsert. A store failure leaves
    /// earlier batches in place; ids are deterministic so a re-run overwrites them.
    pub async fn index_folder(&self, folder: &Path) -> Result<IndexingReport, PipelineError> {
        let loaded = load_pages(folder, self.extractor.as_ref(), self.config.extraction_policy)?;
        info!(folder = %folder.display(), pages = loaded.pages.len(), "found pages to process");

        let mut records = Vec::new();
        for page in &loaded.pages {
            info!(source = %page.source, page = page.page, "processing page");
            let chunks = chunk_words(&page.text, self.config.chunking.chunk_words);

            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                if chunk.trim().is_empty() {
                    continue;
                }

                let values = self
                    .embedder
                    .embed(&chunk)
                    .await
                    .map_err(PipelineError::Embedding)?;

                records.push(VectorRecord {
                    id: vector_id(&page.source, page.page, chunk_index),
                    values,
                    metadata: VectorMetadata {
                        text: chunk,
                        source: page.source.clone(),
                        page: page.page,
                    },
                });
            }
        }

        let batches = upsert_batched(&self.store, &records, self.config.upsert_batch_size).await?;
        info!(vectors = records.len(), batches, "indexing complete");

        Ok(IndexingReport {
            files: loaded.files,
            pages: loaded.pages.len(),
            vectors: records.len(),
            batches,
            skipped_files: loaded.skipped_files,
            completed_at: Utc::now(),
        })
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, PipelineError> {
        self.ask_with_top_k(question, self.config.default_top_k).await
    }

    /// Answers `question` grounded on the `top_k` nearest chunks.
    ///
    /// An empty index is not an error: the question goes out with an empty context.
    pub async fn ask_with_top_k(&self, question: &str, top_k: usize) -> Result<Answer, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::Validation("question is required".to_string()));
        }
        if top_k == 0 {
            return Err(PipelineError::Validation("top_k must be positive".to_string()));
        }

        let query_vector = self
            .embedder
            .embed(question)
            .await
            .map_err(PipelineError::Embedding)?;
        let matches = self.store.query(&query_vector, top_k).await?;
        debug!(matches = matches.len(), top_k, "retrieved context");

        let context = build_context(&matches);
        let user_prompt = build_user_prompt(&context, question);
        let completion = self
            .chat
            .complete(&self.config.system_prompt, &user_prompt)
            .await
            .map_err(PipelineError::Completion)?;

        if let Some(usage) = completion.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat usage"
            );
        }

        Ok(Answer {
            text: completion.text,
            matches,
            usage: completion.usage,
        })
    }

    pub async fn stats(&self) -> Result<IndexStats, PipelineError> {
        Ok(self.store.stats().await?)
    }
}
