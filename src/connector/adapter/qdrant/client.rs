use reqwest::{Method, StatusCode};
use tracing::debug;

use super::dto::*;
use crate::connector::http::{error_message, ApiClient, Auth, HttpClientConfig, Verify};
use crate::domain::{DistanceFunction, DomainError};

/// Typed wrapper over the Qdrant REST API.
#[derive(Debug, Clone)]
pub struct QdrantVectorDbClient {
    client: ApiClient,
}

impl QdrantVectorDbClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        http: HttpClientConfig,
    ) -> Result<Self, DomainError> {
        Verify::valid_url(endpoint, "endpoint", false)?;
        let auth = match api_key {
            Some(key) if !key.is_empty() => Auth::header("api-key", key),
            _ => Auth::None,
        };
        Ok(Self {
            client: ApiClient::new(endpoint, auth, http)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.client.base_url()
    }

    pub async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: DistanceFunction,
    ) -> Result<(), DomainError> {
        Verify::valid_qdrant_collection_name(name)?;
        if vector_size == 0 {
            return Err(DomainError::invalid_input("vector_size must be greater than 0"));
        }
        let request = CreateCollectionRequest {
            vectors: VectorParams {
                size: vector_size,
                distance: qdrant_distance(distance),
            },
        };
        let _: QdrantResponse<bool> = self
            .client
            .put_json(&collection_path(name, ""), &request)
            .await?;
        debug!("Created Qdrant collection '{}' ({} dims)", name, vector_size);
        Ok(())
    }

    pub async fn collection_exists(&self, name: &str) -> Result<bool, DomainError> {
        Verify::valid_qdrant_collection_name(name)?;
        let (status, body) = self
            .client
            .send_raw::<()>(Method::GET, &collection_path(name, ""), None)
            .await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(DomainError::service(s.as_u16(), error_message(s, &body))),
        }
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, DomainError> {
        let response: QdrantResponse<CollectionsList> =
            self.client.get_json("collections").await?;
        Ok(response
            .result
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    pub async fn delete_collection(&self, name: &str) -> Result<(), DomainError> {
        Verify::valid_qdrant_collection_name(name)?;
        let _: QdrantResponse<bool> = self
            .client
            .delete_json(&collection_path(name, ""))
            .await?;
        Ok(())
    }

    pub async fn upsert_points(
        &self,
        name: &str,
        points: &[PointStruct],
    ) -> Result<(), DomainError> {
        if points.is_empty() {
            return Ok(());
        }
        let response: QdrantResponse<UpdateResult> = self
            .client
            .put_json(
                &collection_path(name, "/points?wait=true"),
                &UpsertPointsRequest { points },
            )
            .await?;
        debug!(
            "Upserted {} points into '{}' ({})",
            points.len(),
            name,
            response.result.status
        );
        Ok(())
    }

    pub async fn get_points(
        &self,
        name: &str,
        ids: &[String],
        with_vector: bool,
    ) -> Result<Vec<RetrievedPoint>, DomainError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let request = GetPointsRequest {
            ids,
            with_payload: true,
            with_vector,
        };
        let response: QdrantResponse<Vec<RetrievedPoint>> = self
            .client
            .post_json(&collection_path(name, "/points"), &request)
            .await?;
        Ok(response.result)
    }

    pub async fn delete_points(&self, name: &str, ids: &[String]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let _: QdrantResponse<UpdateResult> = self
            .client
            .post_json(
                &collection_path(name, "/points/delete?wait=true"),
                &DeletePointsRequest { points: ids },
            )
            .await?;
        Ok(())
    }

    pub async fn search_points(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        offset: usize,
        score_threshold: Option<f64>,
        with_vector: bool,
        filter: Option<Filter>,
    ) -> Result<Vec<ScoredPoint>, DomainError> {
        let request = SearchRequest {
            vector,
            limit,
            offset: (offset > 0).then_some(offset),
            score_threshold,
            with_payload: true,
            with_vector,
            filter,
        };
        let response: QdrantResponse<Vec<ScoredPoint>> = self
            .client
            .post_json(&collection_path(name, "/points/search"), &request)
            .await?;
        Ok(response.result)
    }

    /// Points whose payload `field` equals `value`.
    pub async fn scroll_by_payload(
        &self,
        name: &str,
        field: &str,
        value: &str,
        limit: usize,
        with_vector: bool,
    ) -> Result<Vec<RetrievedPoint>, DomainError> {
        let request = ScrollRequest {
            filter: Filter::field_equals(field, value),
            limit,
            with_payload: true,
            with_vector,
        };
        let response: QdrantResponse<ScrollResult> = self
            .client
            .post_json(&collection_path(name, "/points/scroll"), &request)
            .await?;
        Ok(response.result.points)
    }
}

/// `collections/{name}{suffix}` with the characters that would end the path escaped.
fn collection_path(name: &str, suffix: &str) -> String {
    let escaped = name
        .replace('%', "%25")
        .replace('?', "%3F")
        .replace('#', "%23");
    format!("collections/{escaped}{suffix}")
}
