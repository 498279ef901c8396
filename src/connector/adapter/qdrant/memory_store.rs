use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info};

use super::dto::{point_id_string, Filter, PointStruct, QdrantPayload};
use super::QdrantVectorDbClient;
use crate::application::MemoryStore;
use crate::connector::http::HttpClientConfig;
use crate::domain::{
    storage_id_for_key, DistanceFunction, DomainError, Embedding, MemoryQueryResult,
    MemoryRecord, MemorySearch,
};

pub const QDRANT_DEFAULT_URL: &str = "http://localhost:6333";
const DEFAULT_VECTOR_SIZE: usize = 1536;

/// [`MemoryStore`] backed by a Qdrant instance.
///
/// Record keys map to point ids through [`storage_id_for_key`]; the key itself
/// travels in the payload so it can be recovered on read.
pub struct QdrantMemoryStore {
    client: QdrantVectorDbClient,
    vector_size: usize,
    distance: DistanceFunction,
}

impl QdrantMemoryStore {
    pub fn new(client: QdrantVectorDbClient, vector_size: usize) -> Self {
        Self {
            client,
            vector_size,
            distance: DistanceFunction::CosineSimilarity,
        }
    }

    pub fn with_vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size;
        self
    }

    pub fn with_distance(mut self, distance: DistanceFunction) -> Self {
        self.distance = distance;
        self
    }

    /// | Variable             | Default                 |
    /// |----------------------|-------------------------|
    /// | `QDRANT_URL`         | `http://localhost:6333` |
    /// | `QDRANT_API_KEY`     | none                    |
    /// | `QDRANT_VECTOR_SIZE` | `1536`                  |
    pub fn from_env() -> Result<Self, DomainError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let url = var("QDRANT_URL").unwrap_or_else(|| QDRANT_DEFAULT_URL.to_string());
        let vector_size = match var("QDRANT_VECTOR_SIZE") {
            Some(v) => v.trim().parse().map_err(|_| {
                DomainError::invalid_input(format!("QDRANT_VECTOR_SIZE is not a number: {v}"))
            })?,
            None => DEFAULT_VECTOR_SIZE,
        };
        let client =
            QdrantVectorDbClient::new(&url, var("QDRANT_API_KEY"), HttpClientConfig::default())?;
        Ok(Self::new(client, vector_size))
    }

    pub fn client(&self) -> &QdrantVectorDbClient {
        &self.client
    }

    fn to_point(record: &MemoryRecord) -> Result<PointStruct, DomainError> {
        if record.key.is_empty() {
            return Err(DomainError::invalid_input("record key must not be empty"));
        }
        Ok(PointStruct {
            id: storage_id_for_key(&record.key).to_string(),
            vector: record.embedding.vector().to_vec(),
            payload: QdrantPayload::from_record(record),
        })
    }

    /// Relevance in which higher is always closer. Distance scores map to
    /// `1 / (1 + distance)`.
    fn relevance(&self, score: f64) -> f64 {
        if self.distance.is_distance() {
            1.0 / (1.0 + score.max(0.0))
        } else {
            score
        }
    }

    /// Qdrant threshold for a minimum relevance. For distance metrics Qdrant
    /// reads it as a maximum distance, so the relevance mapping is inverted.
    /// A zero relevance sends no threshold, or Qdrant would drop negative
    /// cosine scores.
    fn score_threshold(&self, min_relevance: f64) -> Option<f64> {
        if min_relevance <= 0.0 {
            return None;
        }
        if self.distance.is_distance() {
            Some((1.0 / min_relevance - 1.0).max(0.0))
        } else {
            Some(min_relevance)
        }
    }
}

/// Qdrant answers 404 for a missing collection.
fn missing_collection(collection: &str) -> impl Fn(DomainError) -> DomainError + '_ {
    move |err| match err.status() {
        Some(404) => DomainError::not_found(format!("Collection '{collection}' does not exist")),
        _ => err,
    }
}

#[async_trait]
impl MemoryStore for QdrantMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<(), DomainError> {
        if self.client.collection_exists(collection).await? {
            return Ok(());
        }
        self.client
            .create_collection(collection, self.vector_size, self.distance)
            .await?;
        info!("Created collection '{}' in Qdrant", collection);
        Ok(())
    }

    async fn get_collections(&self) -> Result<Vec<String>, DomainError> {
        self.client.list_collections().await
    }

    async fn does_collection_exist(&self, collection: &str) -> Result<bool, DomainError> {
        self.client.collection_exists(collection).await
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), DomainError> {
        self.client
            .delete_collection(collection)
            .await
            .map_err(missing_collection(collection))
    }

    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String, DomainError> {
        let mut keys = self.upsert_batch(collection, vec![record]).await?;
        keys.pop()
            .ok_or_else(|| DomainError::internal("upsert returned no key"))
    }

    async fn upsert_batch(
        &self,
        collection: &str,
        records: Vec<MemoryRecord>,
    ) -> Result<Vec<String>, DomainError> {
        let points = records
            .iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>, _>>()?;
        self.client
            .upsert_points(collection, &points)
            .await
            .map_err(missing_collection(collection))?;
        Ok(records.into_iter().map(|r| r.key).collect())
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>, DomainError> {
        let mut records = self
            .get_batch(collection, &[key.to_string()], with_embedding)
            .await?;
        Ok(records.pop())
    }

    async fn get_batch(
        &self,
        collection: &str,
        keys: &[String],
        with_embeddings: bool,
    ) -> Result<Vec<MemoryRecord>, DomainError> {
        let ids: Vec<String> = keys
            .iter()
            .map(|k| storage_id_for_key(k).to_string())
            .collect();
        let points = self
            .client
            .get_points(collection, &ids, with_embeddings)
            .await
            .map_err(missing_collection(collection))?;

        let mut by_id: HashMap<String, MemoryRecord> = HashMap::new();
        for point in points {
            let id = point_id_string(&point.id);
            let record = point.payload.unwrap_or_default().into_record(point.vector)?;
            by_id.insert(id, record);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        self.remove_batch(collection, &[key.to_string()]).await
    }

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> Result<(), DomainError> {
        let ids: Vec<String> = keys
            .iter()
            .map(|k| storage_id_for_key(k).to_string())
            .collect();
        self.client
            .delete_points(collection, &ids)
            .await
            .map_err(missing_collection(collection))
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &Embedding,
        options: &MemorySearch,
    ) -> Result<Vec<MemoryQueryResult>, DomainError> {
        if options.limit == 0 {
            return Ok(vec![]);
        }
        let filter = options
            .filter
            .as_ref()
            .map(|f| Filter::field_equals(f.field.as_str(), f.value.as_str()));
        let points = self
            .client
            .search_points(
                collection,
                embedding.vector(),
                options.limit,
                options.offset,
                self.score_threshold(options.min_relevance),
                options.with_embeddings,
                filter,
            )
            .await
            .map_err(missing_collection(collection))?;
        debug!("Qdrant search in '{}' returned {} points", collection, points.len());

        let mut results = points
            .into_iter()
            .map(|p| {
                let relevance = self.relevance(p.score);
                let record = p.payload.unwrap_or_default().into_record(p.vector)?;
                Ok(MemoryQueryResult::new(record, relevance))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(distance: DistanceFunction) -> QdrantMemoryStore {
        let client =
            QdrantVectorDbClient::new(QDRANT_DEFAULT_URL, None, HttpClientConfig::default())
                .unwrap();
        QdrantMemoryStore::new(client, 2).with_distance(distance)
    }

    #[test]
    fn distance_scores_become_relevance() {
        let euclid = store(DistanceFunction::Euclidean);
        assert!((euclid.relevance(0.0) - 1.0).abs() < 1e-12);
        assert!((euclid.relevance(1.0) - 0.5).abs() < 1e-12);
        assert!(euclid.relevance(0.1) > euclid.relevance(5.0));
        assert_eq!(euclid.score_threshold(0.5), Some(1.0));
        assert_eq!(euclid.score_threshold(1.0), Some(0.0));
        assert_eq!(euclid.score_threshold(0.0), None);

        let cosine = store(DistanceFunction::CosineSimilarity);
        assert_eq!(cosine.relevance(0.8), 0.8);
        assert_eq!(cosine.score_threshold(0.7), Some(0.7));
    }

    #[test]
    fn points_are_addressed_by_derived_uuid() {
        let record = MemoryRecord::local_record(
            "doc",
            "text",
            None,
            Embedding::new(vec![1.0, 0.0]),
            None,
            None,
            None,
        );
        let point = QdrantMemoryStore::to_point(&record).unwrap();
        assert_eq!(point.id, storage_id_for_key("doc").to_string());
        assert_eq!(point.payload.key, "doc");
        assert_eq!(point.vector, vec![1.0, 0.0]);
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut record = MemoryRecord::local_record(
            "",
            "text",
            None,
            Embedding::new(vec![1.0]),
            None,
            None,
            None,
        );
        record.key.clear();
        assert!(QdrantMemoryStore::to_point(&record).is_err());
    }

    #[test]
    fn missing_collection_maps_404_to_not_found() {
        let map = missing_collection("notes");
        assert!(map(DomainError::service(404, "Not found")).is_not_found());
        assert!(!map(DomainError::service(500, "boom")).is_not_found());
    }
}
