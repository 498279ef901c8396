use async_trait::async_trait;
use tracing::debug;

use super::dto::{EmbeddingRequest, EmbeddingResponse};
use super::{OpenAiConfig, OpenAiModelKind};
use crate::application::TextEmbeddingService;
use crate::connector::http::ApiClient;
use crate::domain::{DomainError, Embedding};

/// Upper bound on inputs per `/embeddings` request.
pub const MAX_INPUTS_PER_REQUEST: usize = 2048;

pub struct OpenAiTextEmbedding {
    client: ApiClient,
    config: OpenAiConfig,
    dimensions: Option<u32>,
}

impl OpenAiTextEmbedding {
    pub fn new(config: OpenAiConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self {
            client,
            config,
            dimensions: None,
        })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(OpenAiConfig::from_env(OpenAiModelKind::Embedding)?)
    }

    /// Ask the model for shortened vectors (text-embedding-3 models only).
    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

#[async_trait]
impl TextEmbeddingService for OpenAiTextEmbedding {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Embedding>, DomainError> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            let request = EmbeddingRequest {
                input: batch,
                model: self.config.request_model(),
                dimensions: self.dimensions,
                user: None,
            };
            let response: EmbeddingResponse = self
                .client
                .post_json(&self.config.path_for("embeddings"), &request)
                .await?;

            if response.data.len() != batch.len() {
                return Err(DomainError::embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    response.data.len()
                )));
            }

            let mut data = response.data;
            data.sort_by_key(|d| d.index);
            embeddings.extend(data.into_iter().map(|d| Embedding::new(d.embedding)));
        }

        debug!(
            "Generated {} embeddings with {}",
            embeddings.len(),
            self.config.model_id
        );
        Ok(embeddings)
    }
}
