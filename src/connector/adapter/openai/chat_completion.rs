use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use tracing::debug;

use super::dto::{ChatChunk, ChatRequest, ChatResponse};
use super::{OpenAiConfig, OpenAiModelKind};
use crate::application::{ChatCompletionService, ChatStream};
use crate::connector::http::{json_chunks, sse_events, ApiClient};
use crate::domain::{ChatHistory, ChatMessageContent, DomainError, PromptExecutionSettings};

const CHAT_COMPLETIONS: &str = "chat/completions";

/// Chat completions against OpenAI or an Azure OpenAI deployment.
pub struct OpenAiChatCompletion {
    client: ApiClient,
    config: OpenAiConfig,
}

impl OpenAiChatCompletion {
    pub fn new(config: OpenAiConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(OpenAiConfig::from_env(OpenAiModelKind::Chat)?)
    }

    fn request<'a>(
        &'a self,
        history: &ChatHistory,
        settings: &'a PromptExecutionSettings,
        stream: bool,
    ) -> Result<ChatRequest<'a>, DomainError> {
        if history.is_empty() {
            return Err(DomainError::invalid_input("chat history must not be empty"));
        }
        settings.validate()?;
        Ok(ChatRequest::new(
            self.config.request_model(),
            history,
            settings,
            stream,
        ))
    }
}

#[async_trait]
impl ChatCompletionService for OpenAiChatCompletion {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn get_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<Vec<ChatMessageContent>, DomainError> {
        let request = self.request(history, settings, false)?;
        let response: ChatResponse = self
            .client
            .post_json(&self.config.path_for(CHAT_COMPLETIONS), &request)
            .await?;

        debug!(
            "OpenAI returned {} choices for {}",
            response.choices.len(),
            self.config.model_id
        );
        Ok(response.into_messages(&self.config.model_id))
    }

    async fn get_streaming_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<ChatStream, DomainError> {
        let request = self.request(history, settings, true)?;
        let response = self
            .client
            .post_stream(&self.config.path_for(CHAT_COMPLETIONS), &request)
            .await?;

        let model = self.config.model_id.clone();
        let chunks = json_chunks::<ChatChunk>(sse_events(response));
        Ok(chunks
            .flat_map(move |chunk| {
                let items: Vec<Result<_, DomainError>> = match chunk {
                    Ok(c) => c.into_streaming(&model).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .boxed())
    }
}
