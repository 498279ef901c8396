use std::fmt;

use crate::connector::http::{ApiClient, Auth, HttpClientConfig, Verify};
use crate::domain::DomainError;

pub const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Clone)]
pub struct AnthropicConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_id: String,
    /// Sent when the caller's settings leave `max_tokens` unset; the API requires it.
    pub max_tokens: u32,
    pub http: HttpClientConfig,
}

impl fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model_id", &self.model_id)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            base_url: ANTHROPIC_DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            http: HttpClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    /// Construct from environment variables:
    ///
    /// | Variable             | Default                     |
    /// |----------------------|-----------------------------|
    /// | `ANTHROPIC_API_KEY`  | required                    |
    /// | `ANTHROPIC_BASE_URL` | `https://api.anthropic.com` |
    /// | `ANTHROPIC_MODEL`    | `claude-3-5-haiku-latest`   |
    pub fn from_env() -> Result<Self, DomainError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let api_key = Verify::not_null(var("ANTHROPIC_API_KEY"), "ANTHROPIC_API_KEY")?;
        let model = var("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base = var("ANTHROPIC_BASE_URL").unwrap_or_else(|| ANTHROPIC_DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, model).with_base_url(base))
    }

    pub(crate) fn build_client(&self) -> Result<ApiClient, DomainError> {
        Verify::valid_url(&self.base_url, "base_url", true)?;
        Verify::not_empty(&self.api_key, "api_key")?;
        Verify::not_empty(&self.model_id, "model_id")?;
        if self.max_tokens == 0 {
            return Err(DomainError::invalid_input("max_tokens must be greater than 0"));
        }
        Ok(ApiClient::new(
            self.base_url.clone(),
            Auth::header("x-api-key", self.api_key.clone()),
            self.http.clone(),
        )?
        .with_header("anthropic-version", ANTHROPIC_API_VERSION))
    }
}
