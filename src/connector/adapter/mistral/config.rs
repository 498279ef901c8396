use std::fmt;

use crate::connector::http::{ApiClient, Auth, HttpClientConfig, Verify};
use crate::domain::DomainError;

pub const MISTRAL_DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_CHAT_MODEL: &str = "mistral-small-latest";
const DEFAULT_EMBEDDING_MODEL: &str = "mistral-embed";

#[derive(Clone)]
pub struct MistralConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_id: String,
    pub http: HttpClientConfig,
}

impl fmt::Debug for MistralConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model_id", &self.model_id)
            .finish()
    }
}

impl MistralConfig {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            base_url: MISTRAL_DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            http: HttpClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    /// `MISTRALAI_API_KEY` (required), `MISTRALAI_CHAT_MODEL_ID` /
    /// `MISTRALAI_EMBEDDING_MODEL_ID` and `MISTRALAI_BASE_URL` (optional).
    pub fn from_env(embedding: bool) -> Result<Self, DomainError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let api_key = Verify::not_null(var("MISTRALAI_API_KEY"), "MISTRALAI_API_KEY")?;
        let model = if embedding {
            var("MISTRALAI_EMBEDDING_MODEL_ID").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string())
        } else {
            var("MISTRALAI_CHAT_MODEL_ID").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string())
        };
        let mut config = Self::new(api_key, model);
        if let Some(base) = var("MISTRALAI_BASE_URL") {
            config = config.with_base_url(base);
        }
        Ok(config)
    }

    pub(crate) fn build_client(&self) -> Result<ApiClient, DomainError> {
        Verify::valid_url(&self.base_url, "base_url", true)?;
        Verify::not_empty(&self.api_key, "api_key")?;
        Verify::not_empty(&self.model_id, "model_id")?;
        ApiClient::new(
            self.base_url.clone(),
            Auth::Bearer(self.api_key.clone()),
            self.http.clone(),
        )
    }
}
