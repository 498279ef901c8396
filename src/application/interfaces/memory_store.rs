use async_trait::async_trait;

use crate::domain::{DomainError, Embedding, MemoryQueryResult, MemoryRecord, MemorySearch};

/// Collection-scoped vector storage and similarity search.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn create_collection(&self, collection: &str) -> Result<(), DomainError>;

    async fn get_collections(&self) -> Result<Vec<String>, DomainError>;

    async fn does_collection_exist(&self, collection: &str) -> Result<bool, DomainError>;

    async fn delete_collection(&self, collection: &str) -> Result<(), DomainError>;

    /// Insert or replace a record. Returns the record key.
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String, DomainError>;

    /// Keys are returned in input order.
    async fn upsert_batch(
        &self,
        collection: &str,
        records: Vec<MemoryRecord>,
    ) -> Result<Vec<String>, DomainError>;

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>, DomainError>;

    /// Missing keys are skipped.
    async fn get_batch(
        &self,
        collection: &str,
        keys: &[String],
        with_embeddings: bool,
    ) -> Result<Vec<MemoryRecord>, DomainError>;

    async fn remove(&self, collection: &str, key: &str) -> Result<(), DomainError>;

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> Result<(), DomainError>;

    /// Nearest neighbours of `embedding`, sorted by relevance, highest first.
    ///
    /// The filter applies before ranking; `offset` skips that many of the
    /// ranked matches.
    async fn search(
        &self,
        collection: &str,
        embedding: &Embedding,
        options: &MemorySearch,
    ) -> Result<Vec<MemoryQueryResult>, DomainError>;

    async fn get_nearest_matches(
        &self,
        collection: &str,
        embedding: &Embedding,
        limit: usize,
        min_relevance: f64,
        with_embeddings: bool,
    ) -> Result<Vec<MemoryQueryResult>, DomainError> {
        let options = MemorySearch::new(limit)
            .with_min_relevance(min_relevance)
            .with_embeddings(with_embeddings);
        self.search(collection, embedding, &options).await
    }

    async fn get_nearest_match(
        &self,
        collection: &str,
        embedding: &Embedding,
        min_relevance: f64,
        with_embedding: bool,
    ) -> Result<Option<MemoryQueryResult>, DomainError> {
        Ok(self
            .get_nearest_matches(collection, embedding, 1, min_relevance, with_embedding)
            .await?
            .into_iter()
            .next())
    }
}
