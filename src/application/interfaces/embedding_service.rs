use async_trait::async_trait;

use crate::domain::{DomainError, Embedding};

/// Generates vector embeddings from text.
#[async_trait]
pub trait TextEmbeddingService: Send + Sync {
    fn model_id(&self) -> &str;

    /// One embedding per input, in input order.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Embedding>, DomainError>;

    async fn generate_embedding(&self, text: &str) -> Result<Embedding, DomainError> {
        self.generate_embeddings(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding("service returned no embeddings"))
    }
}
