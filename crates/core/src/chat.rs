use crate::error::ModelError;
use crate::models::Completion;
use async_trait::async_trait;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about the provided documents. Use the provided context to answer questions accurately.";

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, ModelError>;
}
