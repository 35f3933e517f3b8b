pub mod chat;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod query;
pub mod retry;
pub mod store;
pub mod stores;
pub mod traits;
pub mod uploads;

pub use chat::{ChatModel, DEFAULT_SYSTEM_PROMPT};
pub use chunking::{chunk_words, vector_id, ChunkingConfig, DEFAULT_CHUNK_WORDS};
pub use config::{RagConfig, DEFAULT_TOP_K};
pub use embeddings::{Embedder, RetryingEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, ModelError, PipelineError, StoreError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{discover_pdf_files, load_pages, LoadedPages};
pub use models::{
    Answer, Completion, ExtractionPolicy, IndexSpec, IndexStats, IndexingReport, Metric, PageRecord,
    QueryMatch, SkippedPdf, TokenUsage, VectorMetadata, VectorRecord,
};
pub use orchestrator::RagCoordinator;
pub use providers::{OpenAiChat, OpenAiEmbedder};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use store::{upsert_batched, DEFAULT_UPSERT_BATCH_SIZE};
pub use stores::{PineconeStore, QdrantStore, ServerlessSpec};
pub use traits::VectorStore;
pub use uploads::{list_pdf_files, save_upload, MAX_UPLOAD_BYTES};
