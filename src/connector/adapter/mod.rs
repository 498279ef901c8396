//! Vendor connectors plus the local store and embedding used offline.

pub mod anthropic;
mod in_memory_memory_store;
pub mod mistral;
mod mock_embedding;
pub mod openai;
pub mod qdrant;
pub mod weaviate;

pub use anthropic::{AnthropicChatCompletion, AnthropicConfig};
pub use in_memory_memory_store::*;
pub use mistral::{MistralChatCompletion, MistralConfig, MistralTextEmbedding};
pub use mock_embedding::*;
pub use openai::{
    OpenAiAudioToText, OpenAiChatCompletion, OpenAiConfig, OpenAiEndpoint, OpenAiModelKind,
    OpenAiModeration, OpenAiTextEmbedding, OpenAiTextToAudio, OpenAiTextToImage,
};
pub use qdrant::{QdrantMemoryStore, QdrantVectorDbClient};
pub use weaviate::{to_class_name, GetNearVectorQuery, WeaviateMemoryStore};
