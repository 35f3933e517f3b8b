use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures talking to the embedding or chat completion service.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {details}")]
    BackendResponse {
        service: &'static str,
        status: u16,
        details: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ModelError {
    /// Bad input and a wrong-width model are deterministic; another attempt gets the same answer.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ModelError::InvalidInput(_) | ModelError::DimensionMismatch { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] IngestError),

    #[error("embedding service failed: {0}")]
    Embedding(#[source] ModelError),

    #[error("vector store failed: {0}")]
    Store(#[from] StoreError),

    #[error("chat completion failed: {0}")]
    Completion(#[source] ModelError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_deterministic_model_errors_skip_retries() {
        assert!(!ModelError::InvalidInput("empty".to_string()).is_retryable());
        assert!(!ModelError::DimensionMismatch {
            expected: 1536,
            actual: 3072
        }
        .is_retryable());
        assert!(ModelError::MalformedResponse("truncated".to_string()).is_retryable());
        assert!(ModelError::BackendResponse {
            service: "embeddings",
            status: 429,
            details: "slow down".to_string(),
        }
        .is_retryable());
    }
}
