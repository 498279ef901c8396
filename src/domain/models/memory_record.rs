use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::Embedding;
use crate::domain::DomainError;

/// Descriptive part of a memory record, stored alongside the vector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryRecordMetadata {
    /// Whether the text lives outside the store (`external_source_name` points at it).
    pub is_reference: bool,
    pub external_source_name: String,
    pub id: String,
    pub description: String,
    pub text: String,
    pub additional_metadata: String,
}

/// A stored vector plus metadata, independent of the backing database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub metadata: MemoryRecordMetadata,
    pub embedding: Embedding,
    pub key: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    pub fn new(
        metadata: MemoryRecordMetadata,
        embedding: Embedding,
        key: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let key = match key {
            Some(k) if !k.is_empty() => k,
            _ => metadata.id.clone(),
        };
        Self {
            metadata,
            embedding,
            key,
            timestamp,
        }
    }

    /// A record whose text is stored in the memory itself.
    pub fn local_record(
        id: impl Into<String>,
        text: impl Into<String>,
        description: Option<String>,
        embedding: Embedding,
        additional_metadata: Option<String>,
        key: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let metadata = MemoryRecordMetadata {
            is_reference: false,
            external_source_name: String::new(),
            id: id.into(),
            description: description.unwrap_or_default(),
            text: text.into(),
            additional_metadata: additional_metadata.unwrap_or_default(),
        };
        Self::new(metadata, embedding, key, timestamp)
    }

    /// A record pointing at content held by an external source.
    pub fn reference_record(
        external_id: impl Into<String>,
        source_name: impl Into<String>,
        description: Option<String>,
        embedding: Embedding,
        additional_metadata: Option<String>,
        key: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let metadata = MemoryRecordMetadata {
            is_reference: true,
            external_source_name: source_name.into(),
            id: external_id.into(),
            description: description.unwrap_or_default(),
            text: String::new(),
            additional_metadata: additional_metadata.unwrap_or_default(),
        };
        Self::new(metadata, embedding, key, timestamp)
    }

    /// Copy of this record with the vector dropped.
    pub fn without_embedding(&self) -> Self {
        Self {
            embedding: Embedding::default(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryQueryResult {
    pub record: MemoryRecord,
    pub relevance: f64,
}

impl MemoryQueryResult {
    pub fn new(record: MemoryRecord, relevance: f64) -> Self {
        Self { record, relevance }
    }

    pub fn display_line(&self) -> String {
        format!("{} (relevance: {:.3})", self.record.key, self.relevance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFunction {
    #[default]
    CosineSimilarity,
    DotProduct,
    Euclidean,
    Manhattan,
}

impl DistanceFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CosineSimilarity => "cosine_similarity",
            Self::DotProduct => "dot_product",
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "dot_product" => Self::DotProduct,
            "euclid" | "euclidean" => Self::Euclidean,
            "manhattan" => Self::Manhattan,
            _ => Self::CosineSimilarity,
        }
    }

    /// True when the raw score is a distance, so smaller means closer.
    pub fn is_distance(&self) -> bool {
        matches!(self, Self::Euclidean | Self::Manhattan)
    }
}

/// Metadata field a vector search can be restricted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Id,
    Text,
    Description,
    AdditionalMetadata,
    ExternalSourceName,
}

impl MetadataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Text => "text",
            Self::Description => "description",
            Self::AdditionalMetadata => "additional_metadata",
            Self::ExternalSourceName => "external_source_name",
        }
    }

    pub fn value_of<'a>(&self, metadata: &'a MemoryRecordMetadata) -> &'a str {
        match self {
            Self::Id => &metadata.id,
            Self::Text => &metadata.text,
            Self::Description => &metadata.description,
            Self::AdditionalMetadata => &metadata.additional_metadata,
            Self::ExternalSourceName => &metadata.external_source_name,
        }
    }
}

impl FromStr for MetadataField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "id" => Ok(Self::Id),
            "text" => Ok(Self::Text),
            "description" => Ok(Self::Description),
            "additional_metadata" => Ok(Self::AdditionalMetadata),
            "external_source_name" => Ok(Self::ExternalSourceName),
            other => Err(DomainError::invalid_input(format!(
                "unknown metadata field '{other}'"
            ))),
        }
    }
}

/// Exact-match condition on one metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: MetadataField,
    pub value: String,
}

impl MetadataFilter {
    pub fn new(field: MetadataField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &MemoryRecordMetadata) -> bool {
        self.field.value_of(metadata) == self.value
    }
}

/// Parses `field=value`.
impl FromStr for MetadataFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s.split_once('=').ok_or_else(|| {
            DomainError::invalid_input(format!("filter '{s}' must look like field=value"))
        })?;
        Ok(Self::new(field.parse()?, value))
    }
}

/// Options for a nearest-neighbour search.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySearch {
    pub limit: usize,
    /// Number of best matches to skip, for paging.
    pub offset: usize,
    pub min_relevance: f64,
    pub with_embeddings: bool,
    pub filter: Option<MetadataFilter>,
}

impl MemorySearch {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            offset: 0,
            min_relevance: 0.0,
            with_embeddings: false,
            filter: None,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f64) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    pub fn with_embeddings(mut self, with_embeddings: bool) -> Self {
        self.with_embeddings = with_embeddings;
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Storage id for a record key.
///
/// Keys that are already UUIDs are used verbatim; any other key maps to a
/// UUIDv8 built from the first 16 bytes of its SHA-256 digest, so the same key
/// always addresses the same point.
pub fn storage_id_for_key(key: &str) -> Uuid {
    if let Ok(id) = Uuid::parse_str(key) {
        return id;
    }
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::new_v8(bytes)
}
