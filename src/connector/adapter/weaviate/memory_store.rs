use async_trait::async_trait;
use futures_util::future::try_join_all;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use super::dto::*;
use super::GetNearVectorQuery;
use crate::application::MemoryStore;
use crate::connector::http::{error_message, ApiClient, Auth, HttpClientConfig, Verify};
use crate::domain::{
    storage_id_for_key, DomainError, Embedding, MemoryQueryResult, MemoryRecord, MemorySearch,
};

pub const WEAVIATE_DEFAULT_URL: &str = "http://localhost:8080";
const CLASS_PREFIX: &str = "SK";

/// Map a collection name onto a valid Weaviate class name.
///
/// Characters outside `[A-Za-z0-9_]` are dropped, the first remaining letter
/// is uppercased and `SK` is prepended. The mapping is not reversible.
pub fn to_class_name(collection: &str) -> Result<String, DomainError> {
    Verify::not_empty(collection, "collection")?;
    let cleaned: String = collection
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let mut chars = cleaned.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    let class = format!("{CLASS_PREFIX}{capitalized}");
    Verify::valid_weaviate_class_name(&class)?;
    Ok(class)
}

fn collection_from_class(class: String) -> String {
    match class.strip_prefix(CLASS_PREFIX) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => class,
    }
}

/// [`MemoryStore`] backed by Weaviate's REST and GraphQL APIs.
pub struct WeaviateMemoryStore {
    client: ApiClient,
}

impl WeaviateMemoryStore {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        http: HttpClientConfig,
    ) -> Result<Self, DomainError> {
        Verify::valid_url(endpoint, "endpoint", false)?;
        Ok(Self {
            client: ApiClient::new(endpoint, Auth::bearer_if_set(api_key), http)?,
        })
    }

    /// `WEAVIATE_URL` (default `http://localhost:8080`) and `WEAVIATE_API_KEY`.
    pub fn from_env() -> Result<Self, DomainError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let url = var("WEAVIATE_URL").unwrap_or_else(|| WEAVIATE_DEFAULT_URL.to_string());
        Self::new(&url, var("WEAVIATE_API_KEY"), HttpClientConfig::default())
    }

    async fn class_exists(&self, class: &str) -> Result<bool, DomainError> {
        let (status, body) = self
            .client
            .send_raw::<()>(Method::GET, &format!("v1/schema/{class}"), None)
            .await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(DomainError::service(s.as_u16(), error_message(s, &body))),
        }
    }

    /// Resolve the class for `collection`, failing with `NotFound` when absent.
    /// Weaviate would otherwise auto-create it with an inferred schema.
    async fn existing_class(&self, collection: &str) -> Result<String, DomainError> {
        let class = to_class_name(collection)?;
        if !self.class_exists(&class).await? {
            return Err(DomainError::not_found(format!(
                "Collection '{collection}' does not exist"
            )));
        }
        Ok(class)
    }

    async fn get_object(
        &self,
        class: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>, DomainError> {
        let id = storage_id_for_key(key);
        let (status, body) = self
            .client
            .send_raw::<()>(
                Method::GET,
                &format!("v1/objects/{class}/{id}?include=vector"),
                None,
            )
            .await?;
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let object: StoredObject = serde_json::from_str(&body)?;
                let vector = if with_embedding { object.vector } else { None };
                object.properties.into_record(vector).map(Some)
            }
            s => Err(DomainError::service(s.as_u16(), error_message(s, &body))),
        }
    }

    async fn delete_object(&self, class: &str, key: &str) -> Result<(), DomainError> {
        let id = storage_id_for_key(key);
        let (status, body) = self
            .client
            .send_raw::<()>(Method::DELETE, &format!("v1/objects/{class}/{id}"), None)
            .await?;
        match status {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(DomainError::service(s.as_u16(), error_message(s, &body))),
        }
    }
}

#[async_trait]
impl MemoryStore for WeaviateMemoryStore {
    async fn create_collection(&self, collection: &str) -> Result<(), DomainError> {
        let class = to_class_name(collection)?;
        if self.class_exists(&class).await? {
            return Ok(());
        }
        let _: Value = self
            .client
            .post_json("v1/schema", &class_definition(&class))
            .await?;
        info!("Created Weaviate class '{}' for collection '{}'", class, collection);
        Ok(())
    }

    async fn get_collections(&self) -> Result<Vec<String>, DomainError> {
        let schema: SchemaResponse = self.client.get_json("v1/schema").await?;
        Ok(schema
            .classes
            .into_iter()
            .map(|c| collection_from_class(c.class))
            .collect())
    }

    async fn does_collection_exist(&self, collection: &str) -> Result<bool, DomainError> {
        self.class_exists(&to_class_name(collection)?).await
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), DomainError> {
        let class = self.existing_class(collection).await?;
        self.client.delete(&format!("v1/schema/{class}")).await?;
        debug!("Deleted Weaviate class '{}'", class);
        Ok(())
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
        if records.is_empty() {
            return Ok(vec![]);
        }
        let class = self.existing_class(collection).await?;

        let objects = records
            .iter()
            .map(|record| {
                Verify::not_empty(&record.key, "record key")?;
                Ok(WeaviateObject {
                    class: class.clone(),
                    id: storage_id_for_key(&record.key).to_string(),
                    properties: WeaviateProperties::from_record(record),
                    vector: record.embedding.vector().to_vec(),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let response: Vec<BatchResponseItem> = self
            .client
            .post_json("v1/batch/objects", &BatchRequest { objects: &objects })
            .await?;

        let errors: Vec<String> = response
            .iter()
            .flat_map(|item| {
                let id = item.id.clone().unwrap_or_default();
                item.errors()
                    .into_iter()
                    .map(move |message| format!("{id}: {message}"))
            })
            .collect();
        if !errors.is_empty() {
            return Err(DomainError::storage(format!(
                "Weaviate rejected {} object(s): {}",
                errors.len(),
                errors.join("; ")
            )));
        }
        debug!("Upserted {} objects into '{}'", objects.len(), class);
        Ok(records.into_iter().map(|r| r.key).collect())
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>, DomainError> {
        let class = to_class_name(collection)?;
        self.get_object(&class, key, with_embedding).await
    }

    async fn get_batch(
        &self,
        collection: &str,
        keys: &[String],
        with_embeddings: bool,
    ) -> Result<Vec<MemoryRecord>, DomainError> {
        let class = to_class_name(collection)?;
        let records = try_join_all(
            keys.iter()
                .map(|key| self.get_object(&class, key, with_embeddings)),
        )
        .await?;
        Ok(records.into_iter().flatten().collect())
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        let class = to_class_name(collection)?;
        self.delete_object(&class, key).await
    }

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> Result<(), DomainError> {
        let class = to_class_name(collection)?;
        try_join_all(keys.iter().map(|key| self.delete_object(&class, key))).await?;
        Ok(())
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
        if embedding.vector().iter().any(|v| !v.is_finite()) {
            return Err(DomainError::invalid_input(
                "query embedding contains non-finite values",
            ));
        }
        let min_relevance = options.min_relevance;
        let with_embeddings = options.with_embeddings;
        let class = self.existing_class(collection).await?;
        let query = GetNearVectorQuery {
            class: &class,
            vector: embedding.vector(),
            limit: options.limit,
            certainty: (min_relevance > 0.0).then_some(min_relevance),
            offset: options.offset,
            filter: options.filter.as_ref(),
            with_vector: with_embeddings,
        }
        .build();

        let response: GraphQlResponse = self
            .client
            .post_json("v1/graphql", &GraphQlRequest { query })
            .await?;
        let hits = response.into_hits(&class)?;
        debug!("Weaviate search in '{}' returned {} hits", class, hits.len());

        let mut results = hits
            .into_iter()
            .map(|hit| {
                let relevance = hit.additional.certainty.unwrap_or_default();
                let vector = if with_embeddings { hit.additional.vector } else { None };
                let record = hit.properties.into_record(vector)?;
                Ok(MemoryQueryResult::new(record, relevance))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        results.retain(|r| r.relevance >= min_relevance);
        results.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        Ok(results)
    }
}
