//! Weaviate schema, object and GraphQL bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::domain::{DomainError, Embedding, MemoryRecord, MemoryRecordMetadata};

pub const PROPERTY_NAMES: [&str; 8] = [
    "sk_id",
    "sk_key",
    "sk_text",
    "sk_description",
    "sk_additional_metadata",
    "sk_external_source_name",
    "sk_is_reference",
    "sk_timestamp",
];

/// Class definition posted to `/v1/schema`. Vectors are always supplied by
/// the caller, so no vectorizer module is configured.
pub fn class_definition(class: &str) -> Value {
    let text = |name: &str, description: &str| {
        json!({"name": name, "description": description, "dataType": ["text"]})
    };
    json!({
        "class": class,
        "description": "Semantic memory records",
        "vectorizer": "none",
        "properties": [
            text("sk_id", "Record id"),
            text("sk_key", "Record key"),
            text("sk_text", "Record text"),
            text("sk_description", "Record description"),
            text("sk_additional_metadata", "Free-form metadata"),
            text("sk_external_source_name", "Source of referenced content"),
            {"name": "sk_is_reference", "description": "Whether the text is external", "dataType": ["boolean"]},
            {"name": "sk_timestamp", "description": "Record timestamp", "dataType": ["date"]},
        ]
    })
}

#[derive(Debug, Deserialize)]
pub struct SchemaResponse {
    #[serde(default)]
    pub classes: Vec<ClassDescription>,
}

#[derive(Debug, Deserialize)]
pub struct ClassDescription {
    pub class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaviateProperties {
    #[serde(deserialize_with = "null_as_default")]
    pub sk_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sk_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sk_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sk_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sk_additional_metadata: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sk_external_source_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sk_is_reference: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sk_timestamp: Option<String>,
}

impl WeaviateProperties {
    pub fn from_record(record: &MemoryRecord) -> Self {
        let m = &record.metadata;
        Self {
            sk_id: m.id.clone(),
            sk_key: record.key.clone(),
            sk_text: m.text.clone(),
            sk_description: m.description.clone(),
            sk_additional_metadata: m.additional_metadata.clone(),
            sk_external_source_name: m.external_source_name.clone(),
            sk_is_reference: m.is_reference,
            sk_timestamp: record.timestamp.map(|t| t.to_rfc3339()),
        }
    }

    pub fn into_record(self, vector: Option<Vec<f32>>) -> Result<MemoryRecord, DomainError> {
        let timestamp = self
            .sk_timestamp
            .as_deref()
            .map(|t| {
                DateTime::parse_from_rfc3339(t)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DomainError::parse(format!("Invalid timestamp '{t}': {e}")))
            })
            .transpose()?;
        let key = if self.sk_key.is_empty() { None } else { Some(self.sk_key) };
        let metadata = MemoryRecordMetadata {
            is_reference: self.sk_is_reference,
            external_source_name: self.sk_external_source_name,
            id: self.sk_id,
            description: self.sk_description,
            text: self.sk_text,
            additional_metadata: self.sk_additional_metadata,
        };
        Ok(MemoryRecord::new(
            metadata,
            Embedding::new(vector.unwrap_or_default()),
            key,
            timestamp,
        ))
    }
}

// GraphQL returns `null` for properties that were stored empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Serialize)]
pub struct WeaviateObject {
    pub class: String,
    pub id: String,
    pub properties: WeaviateProperties,
    pub vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub objects: &'a [WeaviateObject],
}

#[derive(Debug, Deserialize)]
pub struct BatchResponseItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<BatchResult>,
}

#[derive(Debug, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub errors: Option<ErrorList>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorList {
    #[serde(default)]
    pub error: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl BatchResponseItem {
    /// Error messages reported for this object, if any.
    pub fn errors(&self) -> Vec<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.errors.as_ref())
            .map(|e| e.error.iter().map(|m| m.message.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct StoredObject {
    pub id: String,
    #[serde(default)]
    pub properties: WeaviateProperties,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<ErrorMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct NearVectorHit {
    #[serde(flatten)]
    pub properties: WeaviateProperties,
    #[serde(rename = "_additional")]
    pub additional: Additional,
}

#[derive(Debug, Deserialize)]
pub struct Additional {
    pub id: Option<String>,
    #[serde(default)]
    pub certainty: Option<f64>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

impl GraphQlResponse {
    /// Hits under `data.Get.<class>`, or a `StorageError` if the server reported errors.
    pub fn into_hits(self, class: &str) -> Result<Vec<NearVectorHit>, DomainError> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(DomainError::storage(format!(
                "Weaviate query failed: {}",
                messages.join("; ")
            )));
        }
        let hits = self
            .data
            .as_ref()
            .and_then(|d| d.get("Get"))
            .and_then(|g| g.get(class))
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        if hits.is_null() {
            return Ok(vec![]);
        }
        Ok(serde_json::from_value(hits)?)
    }
}
