use async_trait::async_trait;

use super::dto::{MistralEmbeddingRequest, MistralEmbeddingResponse};
use super::MistralConfig;
use crate::application::TextEmbeddingService;
use crate::connector::http::ApiClient;
use crate::domain::{DomainError, Embedding};

pub struct MistralTextEmbedding {
    client: ApiClient,
    config: MistralConfig,
}

impl MistralTextEmbedding {
    pub fn new(config: MistralConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(MistralConfig::from_env(true)?)
    }
}

#[async_trait]
impl TextEmbeddingService for MistralTextEmbedding {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let request = MistralEmbeddingRequest {
            model: &self.config.model_id,
            input: texts,
            encoding_format: "float",
        };
        let response: MistralEmbeddingResponse =
            self.client.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| Embedding::new(d.embedding)).collect())
    }
}
