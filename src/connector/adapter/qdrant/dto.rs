//! Qdrant REST request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    DistanceFunction, DomainError, Embedding, MemoryRecord, MemoryRecordMetadata,
};

/// Every Qdrant response wraps its payload as `{"result": .., "status": ..}`.
#[derive(Debug, Deserialize)]
pub struct QdrantResponse<T> {
    pub result: T,
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub time: Option<f64>,
}

pub fn qdrant_distance(distance: DistanceFunction) -> &'static str {
    match distance {
        DistanceFunction::CosineSimilarity => "Cosine",
        DistanceFunction::DotProduct => "Dot",
        DistanceFunction::Euclidean => "Euclid",
        DistanceFunction::Manhattan => "Manhattan",
    }
}

#[derive(Debug, Serialize)]
pub struct CreateCollectionRequest {
    pub vectors: VectorParams,
}

#[derive(Debug, Serialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsList {
    pub collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionDescription {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResult {
    #[serde(default)]
    pub operation_id: Option<u64>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PointStruct {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: QdrantPayload,
}

#[derive(Debug, Serialize)]
pub struct UpsertPointsRequest<'a> {
    pub points: &'a [PointStruct],
}

#[derive(Debug, Serialize)]
pub struct GetPointsRequest<'a> {
    pub ids: &'a [String],
    pub with_payload: bool,
    pub with_vector: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletePointsRequest<'a> {
    pub points: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct Filter {
    pub must: Vec<FieldCondition>,
}

impl Filter {
    pub fn field_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            must: vec![FieldCondition {
                key: key.into(),
                r#match: MatchValue {
                    value: value.into(),
                },
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldCondition {
    pub key: String,
    pub r#match: MatchValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchValue {
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub vector: &'a [f32],
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,
    pub with_payload: bool,
    pub with_vector: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

#[derive(Debug, Serialize)]
pub struct ScrollRequest {
    pub filter: Filter,
    pub limit: usize,
    pub with_payload: bool,
    pub with_vector: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScrollResult {
    pub points: Vec<RetrievedPoint>,
    #[serde(default)]
    pub next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RetrievedPoint {
    pub id: Value,
    #[serde(default)]
    pub payload: Option<QdrantPayload>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ScoredPoint {
    pub id: Value,
    pub score: f64,
    #[serde(default)]
    pub payload: Option<QdrantPayload>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// Point ids come back as either a UUID string or an unsigned integer.
pub fn point_id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Memory record fields as stored in a point payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantPayload {
    pub id: String,
    pub key: String,
    pub text: String,
    pub description: String,
    pub additional_metadata: String,
    pub external_source_name: String,
    pub is_reference: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl QdrantPayload {
    pub fn from_record(record: &MemoryRecord) -> Self {
        let m = &record.metadata;
        Self {
            id: m.id.clone(),
            key: record.key.clone(),
            text: m.text.clone(),
            description: m.description.clone(),
            additional_metadata: m.additional_metadata.clone(),
            external_source_name: m.external_source_name.clone(),
            is_reference: m.is_reference,
            timestamp: record.timestamp.map(|t| t.to_rfc3339()),
        }
    }

    pub fn into_record(self, vector: Option<Vec<f32>>) -> Result<MemoryRecord, DomainError> {
        let timestamp = self
            .timestamp
            .as_deref()
            .map(|t| {
                DateTime::parse_from_rfc3339(t)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DomainError::parse(format!("Invalid timestamp '{t}': {e}")))
            })
            .transpose()?;
        let key = if self.key.is_empty() { None } else { Some(self.key) };
        let metadata = MemoryRecordMetadata {
            is_reference: self.is_reference,
            external_source_name: self.external_source_name,
            id: self.id,
            description: self.description,
            text: self.text,
            additional_metadata: self.additional_metadata,
        };
        Ok(MemoryRecord::new(
            metadata,
            Embedding::new(vector.unwrap_or_default()),
            key,
            timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn payload_keeps_record_fields_and_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = MemoryRecord::local_record(
            "doc",
            "some text",
            Some("desc".to_string()),
            Embedding::new(vec![0.5, 0.5]),
            Some("{\"a\":1}".to_string()),
            Some("k1".to_string()),
            Some(ts),
        );

        let payload = QdrantPayload::from_record(&record);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["id"], "doc");
        assert_eq!(value["key"], "k1");
        assert_eq!(value["timestamp"], "2024-03-01T12:00:00+00:00");

        let back = payload.into_record(Some(vec![0.5, 0.5])).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn payload_without_key_falls_back_to_id() {
        let payload: QdrantPayload =
            serde_json::from_value(json!({"id": "legacy", "text": "t"})).unwrap();
        let record = payload.into_record(None).unwrap();
        assert_eq!(record.key, "legacy");
        assert!(record.embedding.is_empty());
        assert_eq!(record.timestamp, None);
    }

    #[test]
    fn filter_serializes_as_must_match() {
        let value = serde_json::to_value(Filter::field_equals("id", "doc")).unwrap();
        assert_eq!(value, json!({"must": [{"key": "id", "match": {"value": "doc"}}]}));
    }

    #[test]
    fn distance_names() {
        assert_eq!(qdrant_distance(DistanceFunction::CosineSimilarity), "Cosine");
        assert_eq!(qdrant_distance(DistanceFunction::Euclidean), "Euclid");
    }
}
