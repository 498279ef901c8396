use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::application::{MemoryStore, TextEmbeddingService};
use crate::domain::{DomainError, MemoryQueryResult, MemoryRecord, MemorySearch};

/// Text-in, text-out facade over a [`MemoryStore`]: embeds on write and on query.
pub struct SemanticMemoryUseCase {
    store: Arc<dyn MemoryStore>,
    embedding_service: Arc<dyn TextEmbeddingService>,
}

impl SemanticMemoryUseCase {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        embedding_service: Arc<dyn TextEmbeddingService>,
    ) -> Self {
        Self {
            store,
            embedding_service,
        }
    }

    pub async fn save_information(
        &self,
        collection: &str,
        text: &str,
        id: &str,
        description: Option<String>,
        additional_metadata: Option<String>,
    ) -> Result<String, DomainError> {
        let embedding = self.embedding_service.generate_embedding(text).await?;
        let record = MemoryRecord::local_record(
            id,
            text,
            description,
            embedding,
            additional_metadata,
            None,
            Some(Utc::now()),
        );
        self.ensure_collection(collection).await?;
        let key = self.store.upsert(collection, record).await?;
        debug!("Saved information {} to collection {}", key, collection);
        Ok(key)
    }

    pub async fn save_reference(
        &self,
        collection: &str,
        text: &str,
        external_id: &str,
        external_source_name: &str,
        description: Option<String>,
        additional_metadata: Option<String>,
    ) -> Result<String, DomainError> {
        let embedding = self.embedding_service.generate_embedding(text).await?;
        let record = MemoryRecord::reference_record(
            external_id,
            external_source_name,
            description,
            embedding,
            additional_metadata,
            None,
            Some(Utc::now()),
        );
        self.ensure_collection(collection).await?;
        let key = self.store.upsert(collection, record).await?;
        debug!("Saved reference {} to collection {}", key, collection);
        Ok(key)
    }

    pub async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>, DomainError> {
        if !self.store.does_collection_exist(collection).await? {
            return Ok(None);
        }
        self.store.get(collection, key, with_embedding).await
    }

    pub async fn remove(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        self.store.remove(collection, key).await
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f64,
        with_embeddings: bool,
    ) -> Result<Vec<MemoryQueryResult>, DomainError> {
        let options = MemorySearch::new(limit)
            .with_min_relevance(min_relevance)
            .with_embeddings(with_embeddings);
        self.search_with(collection, query, &options).await
    }

    /// Search with paging and an optional metadata filter.
    pub async fn search_with(
        &self,
        collection: &str,
        query: &str,
        options: &MemorySearch,
    ) -> Result<Vec<MemoryQueryResult>, DomainError> {
        info!("Searching {} for: {}", collection, query);
        let start_time = Instant::now();

        if !self.store.does_collection_exist(collection).await? {
            debug!("Collection {} does not exist, nothing to search", collection);
            return Ok(vec![]);
        }

        let embedding = self.embedding_service.generate_embedding(query).await?;
        let results = self
            .store
            .search(collection, &embedding, options)
            .await?;

        info!(
            "Found {} results in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    pub async fn get_collections(&self) -> Result<Vec<String>, DomainError> {
        self.store.get_collections().await
    }

    async fn ensure_collection(&self, collection: &str) -> Result<(), DomainError> {
        if !self.store.does_collection_exist(collection).await? {
            debug!("Creating collection {}", collection);
            self.store.create_collection(collection).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{InMemoryMemoryStore, MockEmbedding};

    fn use_case() -> SemanticMemoryUseCase {
        SemanticMemoryUseCase::new(
            Arc::new(InMemoryMemoryStore::new()),
            Arc::new(MockEmbedding::with_dimensions(64)),
        )
    }

    #[tokio::test]
    async fn save_creates_collection_and_search_finds_exact_text() {
        let memory = use_case();

        memory
            .save_information("facts", "The sky is blue", "sky", None, None)
            .await
            .unwrap();
        memory
            .save_information("facts", "Grass is green", "grass", None, None)
            .await
            .unwrap();

        let results = memory
            .search("facts", "The sky is blue", 1, 0.0, false)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.key, "sky");
        assert!(results[0].relevance > 0.99);
        assert!(results[0].record.embedding.is_empty());
    }

    #[tokio::test]
    async fn search_on_missing_collection_is_empty() {
        let memory = use_case();
        let results = memory.search("nothing", "query", 5, 0.0, false).await.unwrap();
        assert!(results.is_empty());
        assert!(memory.get("nothing", "key", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reference_records_round_trip() {
        let memory = use_case();
        memory
            .save_reference(
                "repos",
                "project readme",
                "https://github.com/microsoft/semantic-kernel",
                "GitHub",
                Some("README".to_string()),
                None,
            )
            .await
            .unwrap();

        let record = memory
            .get("repos", "https://github.com/microsoft/semantic-kernel", false)
            .await
            .unwrap()
            .expect("record");
        assert!(record.metadata.is_reference);
        assert_eq!(record.metadata.external_source_name, "GitHub");
        assert!(record.timestamp.is_some());
    }

    #[tokio::test]
    async fn remove_deletes_record() {
        let memory = use_case();
        memory
            .save_information("facts", "water is wet", "water", None, None)
            .await
            .unwrap();
        memory.remove("facts", "water").await.unwrap();
        assert!(memory.get("facts", "water", false).await.unwrap().is_none());
        assert_eq!(memory.get_collections().await.unwrap(), vec!["facts"]);
    }
}
