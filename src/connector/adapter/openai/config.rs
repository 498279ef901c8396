use std::fmt;

use crate::connector::http::{ApiClient, Auth, HttpClientConfig, Verify};
use crate::domain::DomainError;

pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const AZURE_DEFAULT_API_VERSION: &str = "2024-02-01";

/// Which OpenAI capability a config is for; selects the model / deployment
/// environment variable and default model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiModelKind {
    Chat,
    Embedding,
    TextToImage,
    TextToAudio,
    AudioToText,
    Moderation,
}

impl OpenAiModelKind {
    fn openai_env(&self) -> &'static str {
        match self {
            Self::Chat => "OPENAI_CHAT_MODEL_ID",
            Self::Embedding => "OPENAI_EMBEDDING_MODEL_ID",
            Self::TextToImage => "OPENAI_TEXT_TO_IMAGE_MODEL_ID",
            Self::TextToAudio => "OPENAI_TEXT_TO_AUDIO_MODEL_ID",
            Self::AudioToText => "OPENAI_AUDIO_TO_TEXT_MODEL_ID",
            Self::Moderation => "OPENAI_MODERATION_MODEL_ID",
        }
    }

    fn azure_env(&self) -> &'static str {
        match self {
            Self::Chat => "AZURE_OPENAI_CHAT_DEPLOYMENT_NAME",
            Self::Embedding => "AZURE_OPENAI_EMBEDDING_DEPLOYMENT_NAME",
            Self::TextToImage => "AZURE_OPENAI_TEXT_TO_IMAGE_DEPLOYMENT_NAME",
            Self::TextToAudio => "AZURE_OPENAI_TEXT_TO_AUDIO_DEPLOYMENT_NAME",
            Self::AudioToText => "AZURE_OPENAI_AUDIO_TO_TEXT_DEPLOYMENT_NAME",
            Self::Moderation => "AZURE_OPENAI_MODERATION_DEPLOYMENT_NAME",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::Chat => "gpt-4o-mini",
            Self::Embedding => "text-embedding-3-small",
            Self::TextToImage => "dall-e-3",
            Self::TextToAudio => "tts-1",
            Self::AudioToText => "whisper-1",
            Self::Moderation => "omni-moderation-latest",
        }
    }
}

#[derive(Clone)]
pub enum OpenAiEndpoint {
    OpenAi {
        base_url: String,
        api_key: String,
        organization: Option<String>,
    },
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
        api_key: String,
    },
}

impl fmt::Debug for OpenAiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi {
                base_url,
                organization,
                ..
            } => f
                .debug_struct("OpenAi")
                .field("base_url", base_url)
                .field("api_key", &"***")
                .field("organization", organization)
                .finish(),
            Self::Azure {
                endpoint,
                deployment,
                api_version,
                ..
            } => f
                .debug_struct("Azure")
                .field("endpoint", endpoint)
                .field("deployment", deployment)
                .field("api_version", api_version)
                .field("api_key", &"***")
                .finish(),
        }
    }
}

/// Where and how to reach an OpenAI-compatible deployment.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub endpoint: OpenAiEndpoint,
    pub model_id: String,
    pub http: HttpClientConfig,
}

impl OpenAiConfig {
    pub fn openai(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            endpoint: OpenAiEndpoint::OpenAi {
                base_url: OPENAI_DEFAULT_BASE_URL.to_string(),
                api_key: api_key.into(),
                organization: None,
            },
            model_id: model_id.into(),
            http: HttpClientConfig::default(),
        }
    }

    /// Azure deployments are addressed by name; the deployment doubles as model id.
    pub fn azure(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let deployment = deployment.into();
        Self {
            endpoint: OpenAiEndpoint::Azure {
                endpoint: endpoint.into(),
                deployment: deployment.clone(),
                api_version: AZURE_DEFAULT_API_VERSION.to_string(),
                api_key: api_key.into(),
            },
            model_id: deployment,
            http: HttpClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        if let OpenAiEndpoint::OpenAi { base_url, .. } = &mut self.endpoint {
            *base_url = url.into();
        }
        self
    }

    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        if let OpenAiEndpoint::OpenAi { organization, .. } = &mut self.endpoint {
            *organization = Some(org.into());
        }
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        if let OpenAiEndpoint::Azure { api_version, .. } = &mut self.endpoint {
            *api_version = version.into();
        }
        self
    }

    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    pub fn is_azure(&self) -> bool {
        matches!(self.endpoint, OpenAiEndpoint::Azure { .. })
    }

    /// Azure when `AZURE_OPENAI_ENDPOINT` is set, OpenAI otherwise.
    pub fn from_env(kind: OpenAiModelKind) -> Result<Self, DomainError> {
        Self::from_lookup(kind, |name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// | Variable                         | Default                     |
    /// |----------------------------------|-----------------------------|
    /// | `OPENAI_API_KEY`                 | required for OpenAI         |
    /// | `OPENAI_BASE_URL`                | `https://api.openai.com/v1` |
    /// | `OPENAI_ORG_ID`                  | unset                       |
    /// | `OPENAI_<KIND>_MODEL_ID`         | per-kind default model      |
    /// | `AZURE_OPENAI_ENDPOINT`          | selects Azure when set      |
    /// | `AZURE_OPENAI_API_KEY`           | required for Azure          |
    /// | `AZURE_OPENAI_<KIND>_DEPLOYMENT_NAME` | required for Azure     |
    /// | `AZURE_OPENAI_API_VERSION`       | `2024-02-01`                |
    pub fn from_lookup<F>(kind: OpenAiModelKind, lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = non_empty("AZURE_OPENAI_ENDPOINT") {
            let deployment = Verify::not_null(non_empty(kind.azure_env()), kind.azure_env())?;
            let api_key = Verify::not_null(non_empty("AZURE_OPENAI_API_KEY"), "AZURE_OPENAI_API_KEY")?;
            let mut config = Self::azure(endpoint, deployment, api_key);
            if let Some(version) = non_empty("AZURE_OPENAI_API_VERSION") {
                config = config.with_api_version(version);
            }
            return Ok(config);
        }

        let api_key = Verify::not_null(non_empty("OPENAI_API_KEY"), "OPENAI_API_KEY")?;
        let model = non_empty(kind.openai_env()).unwrap_or_else(|| kind.default_model().to_string());
        let mut config = Self::openai(api_key, model);
        if let Some(base) = non_empty("OPENAI_BASE_URL") {
            config = config.with_base_url(base);
        }
        if let Some(org) = non_empty("OPENAI_ORG_ID") {
            config = config.with_organization(org);
        }
        Ok(config)
    }

    /// Validate and build the HTTP client for this endpoint.
    pub(crate) fn build_client(&self) -> Result<ApiClient, DomainError> {
        Verify::not_empty(&self.model_id, "model_id")?;
        match &self.endpoint {
            OpenAiEndpoint::OpenAi {
                base_url,
                api_key,
                organization,
            } => {
                Verify::valid_url(base_url, "base_url", false)?;
                let mut client = ApiClient::new(
                    base_url.clone(),
                    Auth::bearer_if_set(Some(api_key.clone())),
                    self.http.clone(),
                )?;
                if let Some(org) = organization {
                    client = client.with_header("OpenAI-Organization", org.clone());
                }
                Ok(client)
            }
            OpenAiEndpoint::Azure {
                endpoint,
                deployment,
                api_key,
                ..
            } => {
                Verify::valid_url(endpoint, "endpoint", true)?;
                Verify::not_empty(deployment, "deployment")?;
                Verify::not_empty(api_key, "api_key")?;
                let base = format!(
                    "{}/openai/deployments/{}",
                    endpoint.trim_end_matches('/'),
                    deployment
                );
                ApiClient::new(base, Auth::header("api-key", api_key.clone()), self.http.clone())
            }
        }
    }

    /// Relative path for an operation such as `chat/completions`.
    pub(crate) fn path_for(&self, operation: &str) -> String {
        match &self.endpoint {
            OpenAiEndpoint::OpenAi { .. } => operation.to_string(),
            OpenAiEndpoint::Azure { api_version, .. } => {
                format!("{operation}?api-version={api_version}")
            }
        }
    }

    /// The `model` body field; Azure infers it from the deployment.
    pub(crate) fn request_model(&self) -> Option<&str> {
        if self.is_azure() {
            None
        } else {
            Some(&self.model_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn openai_from_lookup_uses_defaults() {
        let config =
            OpenAiConfig::from_lookup(OpenAiModelKind::Embedding, lookup(&[("OPENAI_API_KEY", "sk")]))
                .unwrap();
        assert!(!config.is_azure());
        assert_eq!(config.model_id, "text-embedding-3-small");
        assert_eq!(config.request_model(), Some("text-embedding-3-small"));
        assert_eq!(config.path_for("embeddings"), "embeddings");
    }

    #[test]
    fn azure_selected_by_endpoint() {
        let config = OpenAiConfig::from_lookup(
            OpenAiModelKind::Chat,
            lookup(&[
                ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
                ("AZURE_OPENAI_API_KEY", "k"),
                ("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME", "gpt4"),
                ("OPENAI_API_KEY", "ignored"),
            ]),
        )
        .unwrap();
        assert!(config.is_azure());
        assert_eq!(config.model_id, "gpt4");
        assert_eq!(config.request_model(), None);
        assert_eq!(
            config.path_for("chat/completions"),
            "chat/completions?api-version=2024-02-01"
        );

        let client = config.build_client().unwrap();
        assert_eq!(
            client.base_url(),
            "https://res.openai.azure.com/openai/deployments/gpt4"
        );
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let err = OpenAiConfig::from_lookup(OpenAiModelKind::Chat, lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = OpenAiConfig::from_lookup(
            OpenAiModelKind::Chat,
            lookup(&[
                ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
                ("AZURE_OPENAI_API_KEY", "k"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME"));
    }

    #[test]
    fn debug_output_hides_api_keys() {
        let openai = format!("{:?}", OpenAiConfig::openai("sk-secret", "gpt-4o-mini"));
        assert!(openai.contains("gpt-4o-mini"));
        assert!(!openai.contains("sk-secret"));

        let azure = format!(
            "{:?}",
            OpenAiConfig::azure("https://res.openai.azure.com", "gpt4", "az-secret")
        );
        assert!(azure.contains("gpt4"));
        assert!(!azure.contains("az-secret"));
    }

    #[test]
    fn azure_requires_https() {
        let config = OpenAiConfig::azure("http://res.openai.azure.com", "d", "k");
        assert!(config.build_client().is_err());
    }
}
