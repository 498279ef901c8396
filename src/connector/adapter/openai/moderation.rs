use async_trait::async_trait;

use super::dto::{ModerationRequest, ModerationResponse};
use super::{OpenAiConfig, OpenAiModelKind};
use crate::application::ModerationService;
use crate::connector::http::ApiClient;
use crate::domain::{DomainError, ModerationResult};

pub struct OpenAiModeration {
    client: ApiClient,
    config: OpenAiConfig,
}

impl OpenAiModeration {
    pub fn new(config: OpenAiConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(OpenAiConfig::from_env(OpenAiModelKind::Moderation)?)
    }
}

#[async_trait]
impl ModerationService for OpenAiModeration {
    async fn moderate(&self, inputs: &[String]) -> Result<Vec<ModerationResult>, DomainError> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }
        let request = ModerationRequest {
            input: inputs,
            model: self.config.request_model(),
        };
        let response: ModerationResponse = self
            .client
            .post_json(&self.config.path_for("moderations"), &request)
            .await?;
        Ok(response.results.into_iter().map(ModerationResult::from).collect())
    }
}
