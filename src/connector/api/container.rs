use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::application::{
    AudioToTextService, ChatCompletionService, ChatSessionUseCase, MemoryStore, ModerationService,
    SemanticMemoryUseCase, TextEmbeddingService, TextToAudioService, TextToImageService,
};
use crate::cli::{MemoryBackend, Provider};
use crate::connector::adapter::{
    AnthropicChatCompletion, InMemoryMemoryStore, MistralChatCompletion, MistralTextEmbedding,
    MockEmbedding, OpenAiAudioToText, OpenAiChatCompletion, OpenAiConfig, OpenAiModelKind,
    OpenAiModeration, OpenAiTextEmbedding, OpenAiTextToAudio, OpenAiTextToImage,
    QdrantMemoryStore, WeaviateMemoryStore,
};

pub struct ContainerConfig {
    pub provider: Provider,
    pub memory: MemoryBackend,
    pub mock_embeddings: bool,
}

/// Wires connectors from CLI flags and environment variables.
///
/// The memory store is built eagerly; provider services are built on demand
/// so commands that do not need a provider work without its credentials.
pub struct Container {
    memory_store: Arc<dyn MemoryStore>,
    config: ContainerConfig,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self> {
        let memory_store: Arc<dyn MemoryStore> = match config.memory {
            MemoryBackend::Volatile => {
                debug!("Using volatile in-memory store");
                Arc::new(InMemoryMemoryStore::new())
            }
            MemoryBackend::Qdrant => {
                let mut store = QdrantMemoryStore::from_env()?;
                if config.mock_embeddings {
                    store = store.with_vector_size(MockEmbedding::new().dimensions());
                }
                debug!("Using Qdrant at {}", store.client().endpoint());
                Arc::new(store)
            }
            MemoryBackend::Weaviate => {
                debug!("Using Weaviate memory store");
                Arc::new(WeaviateMemoryStore::from_env()?)
            }
        };

        Ok(Self {
            memory_store,
            config,
        })
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    /// OpenAI or Azure settings for `kind`, honoring the selected provider
    /// even when the other one's variables are also set.
    fn openai_config(&self, kind: OpenAiModelKind) -> Result<OpenAiConfig> {
        match self.config.provider {
            Provider::Azure => {
                let config = OpenAiConfig::from_env(kind)?;
                if !config.is_azure() {
                    bail!("--provider azure requires AZURE_OPENAI_ENDPOINT");
                }
                Ok(config)
            }
            Provider::Openai => Ok(OpenAiConfig::from_lookup(kind, |name: &str| {
                if name.starts_with("AZURE_") {
                    None
                } else {
                    std::env::var(name).ok()
                }
            })?),
            other => bail!("{:?} does not offer this capability", other),
        }
    }

    pub fn chat_service(&self) -> Result<Arc<dyn ChatCompletionService>> {
        Ok(match self.config.provider {
            Provider::Openai | Provider::Azure => Arc::new(OpenAiChatCompletion::new(
                self.openai_config(OpenAiModelKind::Chat)?,
            )?),
            Provider::Mistral => Arc::new(MistralChatCompletion::from_env()?),
            Provider::Anthropic => Arc::new(AnthropicChatCompletion::from_env()?),
        })
    }

    pub fn chat_session(&self) -> Result<ChatSessionUseCase> {
        Ok(ChatSessionUseCase::new(self.chat_service()?))
    }

    pub fn embedding_service(&self) -> Result<Arc<dyn TextEmbeddingService>> {
        if self.config.mock_embeddings {
            debug!("Using mock embedding service");
            return Ok(Arc::new(MockEmbedding::new()));
        }
        Ok(match self.config.provider {
            Provider::Openai | Provider::Azure => Arc::new(OpenAiTextEmbedding::new(
                self.openai_config(OpenAiModelKind::Embedding)?,
            )?),
            Provider::Mistral => Arc::new(MistralTextEmbedding::from_env()?),
            Provider::Anthropic => {
                bail!("Anthropic has no embedding API; pass --mock-embeddings or another provider")
            }
        })
    }

    pub fn memory_store(&self) -> Arc<dyn MemoryStore> {
        Arc::clone(&self.memory_store)
    }

    pub fn semantic_memory(&self) -> Result<SemanticMemoryUseCase> {
        Ok(SemanticMemoryUseCase::new(
            self.memory_store(),
            self.embedding_service()?,
        ))
    }

    /// `inline` asks for image bytes instead of a hosted URL.
    pub fn image_service(&self, inline: bool) -> Result<Arc<dyn TextToImageService>> {
        let config = self.openai_config(OpenAiModelKind::TextToImage)?;
        let service = OpenAiTextToImage::new(config)?;
        Ok(if inline {
            Arc::new(service.with_inline_data())
        } else {
            Arc::new(service)
        })
    }

    pub fn speech_service(&self) -> Result<Arc<dyn TextToAudioService>> {
        let config = self.openai_config(OpenAiModelKind::TextToAudio)?;
        Ok(Arc::new(OpenAiTextToAudio::new(config)?))
    }

    pub fn transcription_service(&self) -> Result<Arc<dyn AudioToTextService>> {
        let config = self.openai_config(OpenAiModelKind::AudioToText)?;
        Ok(Arc::new(OpenAiAudioToText::new(config)?))
    }

    pub fn moderation_service(&self) -> Result<Arc<dyn ModerationService>> {
        let config = self.openai_config(OpenAiModelKind::Moderation)?;
        Ok(Arc::new(OpenAiModeration::new(config)?))
    }
}
