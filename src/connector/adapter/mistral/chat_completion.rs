use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use tracing::debug;

use super::dto::{MistralChatChunk, MistralChatRequest, MistralChatResponse};
use super::MistralConfig;
use crate::application::{ChatCompletionService, ChatStream};
use crate::connector::http::{json_chunks, sse_events, ApiClient};
use crate::domain::{ChatHistory, ChatMessageContent, DomainError, PromptExecutionSettings};

pub struct MistralChatCompletion {
    client: ApiClient,
    config: MistralConfig,
    safe_prompt: bool,
}

impl MistralChatCompletion {
    pub fn new(config: MistralConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self {
            client,
            config,
            safe_prompt: false,
        })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(MistralConfig::from_env(false)?)
    }

    /// Prepend Mistral's guardrail system prompt server-side.
    pub fn with_safe_prompt(mut self, enabled: bool) -> Self {
        self.safe_prompt = enabled;
        self
    }

    fn request<'a>(
        &'a self,
        history: &ChatHistory,
        settings: &'a PromptExecutionSettings,
        stream: bool,
    ) -> Result<MistralChatRequest<'a>, DomainError> {
        if history.is_empty() {
            return Err(DomainError::invalid_input("chat history must not be empty"));
        }
        settings.validate()?;
        // Mistral caps temperature at 1.0.
        if settings.temperature.is_some_and(|t| t > 1.0) {
            return Err(DomainError::invalid_input(
                "temperature must be between 0 and 1 for Mistral",
            ));
        }
        Ok(MistralChatRequest::new(
            &self.config.model_id,
            history,
            settings,
            self.safe_prompt,
            stream,
        ))
    }
}

#[async_trait]
impl ChatCompletionService for MistralChatCompletion {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn get_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<Vec<ChatMessageContent>, DomainError> {
        let request = self.request(history, settings, false)?;
        let response: MistralChatResponse =
            self.client.post_json("chat/completions", &request).await?;
        debug!("Mistral returned {} choices", response.choices.len());
        Ok(response.into_messages(&self.config.model_id))
    }

    async fn get_streaming_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<ChatStream, DomainError> {
        let request = self.request(history, settings, true)?;
        let response = self.client.post_stream("chat/completions", &request).await?;

        let model = self.config.model_id.clone();
        Ok(json_chunks::<MistralChatChunk>(sse_events(response))
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
