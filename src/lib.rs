pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    AudioToTextService, ChatCompletionService, ChatSessionUseCase, ChatStream, MemoryStore,
    ModerationService, SemanticMemoryUseCase, TextEmbeddingService, TextToAudioService,
    TextToImageService,
};

pub use connector::{
    AnthropicChatCompletion, AnthropicConfig, ApiClient, Auth, HttpClientConfig,
    InMemoryMemoryStore, MistralChatCompletion, MistralConfig, MistralTextEmbedding,
    MockEmbedding, OpenAiAudioToText, OpenAiChatCompletion, OpenAiConfig, OpenAiEndpoint,
    OpenAiModelKind, OpenAiModeration, OpenAiTextEmbedding, OpenAiTextToAudio, OpenAiTextToImage,
    QdrantMemoryStore, QdrantVectorDbClient, RetryConfig, WeaviateMemoryStore,
};

pub use domain::{
    AudioContent, AuthorRole, ChatHistory, ChatMessageContent, ContentItem, DistanceFunction,
    DomainError, Embedding, FinishReason, ImageContent, ImageGenerationRequest,
    MemoryQueryResult, MemoryRecord, MemoryRecordMetadata, MemorySearch, MetadataField,
    MetadataFilter, ModerationResult,
    PromptExecutionSettings, StreamingChatMessageContent, TextContent,
};
