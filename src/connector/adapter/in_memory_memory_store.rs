use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::MemoryStore;
use crate::domain::{DomainError, Embedding, MemoryQueryResult, MemoryRecord, MemorySearch};

type Collection = HashMap<String, MemoryRecord>;

/// Volatile [`MemoryStore`] ranking by cosine similarity. Everything is lost
/// when the store is dropped.
pub struct InMemoryMemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(collection: &str) -> DomainError {
    DomainError::not_found(format!("Collection '{collection}' does not exist"))
}

fn strip(record: &MemoryRecord, with_embedding: bool) -> MemoryRecord {
    if with_embedding {
        record.clone()
    } else {
        record.without_embedding()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<(), DomainError> {
        if collection.trim().is_empty() {
            return Err(DomainError::invalid_input("collection must not be empty"));
        }
        let mut collections = self.collections.lock().await;
        collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn get_collections(&self) -> Result<Vec<String>, DomainError> {
        let collections = self.collections.lock().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn does_collection_exist(&self, collection: &str) -> Result<bool, DomainError> {
        Ok(self.collections.lock().await.contains_key(collection))
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), DomainError> {
        self.collections
            .lock()
            .await
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| missing(collection))
    }

    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String, DomainError> {
        let mut collections = self.collections.lock().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        let key = record.key.clone();
        records.insert(key.clone(), record);
        Ok(key)
    }

    async fn upsert_batch(
        &self,
        collection: &str,
        records: Vec<MemoryRecord>,
    ) -> Result<Vec<String>, DomainError> {
        let mut collections = self.collections.lock().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        let keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
        for record in records {
            stored.insert(record.key.clone(), record);
        }
        debug!("Saved {} records to memory collection '{}'", keys.len(), collection);
        Ok(keys)
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>, DomainError> {
        let collections = self.collections.lock().await;
        let records = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(records.get(key).map(|r| strip(r, with_embedding)))
    }

    async fn get_batch(
        &self,
        collection: &str,
        keys: &[String],
        with_embeddings: bool,
    ) -> Result<Vec<MemoryRecord>, DomainError> {
        let collections = self.collections.lock().await;
        let records = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(keys
            .iter()
            .filter_map(|k| records.get(k))
            .map(|r| strip(r, with_embeddings))
            .collect())
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        let mut collections = self.collections.lock().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        records.remove(key);
        Ok(())
    }

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> Result<(), DomainError> {
        let mut collections = self.collections.lock().await;
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        for key in keys {
            records.remove(key);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &Embedding,
        options: &MemorySearch,
    ) -> Result<Vec<MemoryQueryResult>, DomainError> {
        let collections = self.collections.lock().await;
        let records = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut results: Vec<MemoryQueryResult> = records
            .values()
            .filter(|r| !r.embedding.is_empty())
            .filter(|r| {
                options
                    .filter
                    .as_ref()
                    .map_or(true, |f| f.matches(&r.metadata))
            })
            .map(|r| {
                let relevance = embedding.cosine_similarity(&r.embedding) as f64;
                (r, relevance)
            })
            .filter(|(_, relevance)| *relevance >= options.min_relevance)
            .map(|(r, relevance)| {
                MemoryQueryResult::new(strip(r, options.with_embeddings), relevance)
            })
            .collect();

        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        let results: Vec<_> = results
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect();

        debug!(
            "Found {} matches in memory collection '{}'",
            results.len(),
            collection
        );
        Ok(results)
    }
}
