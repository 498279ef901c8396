use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{
    ChatHistory, ChatMessageContent, DomainError, PromptExecutionSettings,
    StreamingChatMessageContent,
};

/// A stream of incremental chat chunks. Ends after the vendor's terminator.
pub type ChatStream = BoxStream<'static, Result<StreamingChatMessageContent, DomainError>>;

/// Sends a chat history to a model and returns its replies.
///
/// Implementors own transport, serialization and the vendor's message schema;
/// callers only see [`ChatMessageContent`].
#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    fn model_id(&self) -> &str;

    /// One reply per requested choice (`results_per_prompt`).
    async fn get_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<Vec<ChatMessageContent>, DomainError>;

    async fn get_streaming_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<ChatStream, DomainError>;
}
