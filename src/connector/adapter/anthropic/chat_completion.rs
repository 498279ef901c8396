use async_trait::async_trait;
use futures_util::future::ready;
use futures_util::stream;
use futures_util::StreamExt;
use tracing::debug;

use super::dto::{MessagesRequest, MessagesResponse, StreamEvent, StreamStep};
use super::AnthropicConfig;
use crate::application::{ChatCompletionService, ChatStream};
use crate::connector::http::{sse_events, ApiClient};
use crate::domain::{ChatHistory, ChatMessageContent, DomainError, PromptExecutionSettings};

const MESSAGES_PATH: &str = "v1/messages";

/// Chat completions over the Anthropic Messages API.
pub struct AnthropicChatCompletion {
    client: ApiClient,
    config: AnthropicConfig,
}

impl AnthropicChatCompletion {
    pub fn new(config: AnthropicConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(AnthropicConfig::from_env()?)
    }

    fn request<'a>(
        &'a self,
        history: &ChatHistory,
        settings: &'a PromptExecutionSettings,
        stream: bool,
    ) -> Result<MessagesRequest<'a>, DomainError> {
        settings.validate()?;
        if settings.results_per_prompt > 1 {
            return Err(DomainError::invalid_input(
                "Anthropic returns a single completion per request",
            ));
        }
        if settings.temperature.is_some_and(|t| t > 1.0) {
            return Err(DomainError::invalid_input(
                "temperature must be between 0 and 1 for Anthropic",
            ));
        }

        let mut request = MessagesRequest::new(
            &self.config.model_id,
            settings.max_tokens.unwrap_or(self.config.max_tokens),
            history,
            stream,
        );
        if request.messages.is_empty() {
            return Err(DomainError::invalid_input(
                "chat history must contain at least one user or assistant message",
            ));
        }
        request.temperature = settings.temperature;
        request.top_p = settings.top_p;
        request.stop_sequences = settings.stop_sequences.as_deref();
        Ok(request)
    }
}

#[async_trait]
impl ChatCompletionService for AnthropicChatCompletion {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    async fn get_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<Vec<ChatMessageContent>, DomainError> {
        let request = self.request(history, settings, false)?;
        let response: MessagesResponse = self.client.post_json(MESSAGES_PATH, &request).await?;
        debug!(
            "Anthropic returned {} content blocks (stop_reason: {:?})",
            response.content.len(),
            response.stop_reason
        );
        Ok(vec![response.into_message(&self.config.model_id)])
    }

    async fn get_streaming_chat_message_contents(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> Result<ChatStream, DomainError> {
        let request = self.request(history, settings, true)?;
        let response = self.client.post_stream(MESSAGES_PATH, &request).await?;

        let model = self.config.model_id.clone();
        // Ends after `message_stop` or the first error without waiting for the
        // connection to close.
        Ok(sse_events(response)
            .scan(false, move |failed, item| {
                if *failed {
                    return ready(None);
                }
                let step = item
                    .and_then(|event| event.parse_data::<StreamEvent>())
                    .and_then(|event| event.into_step(&model));
                let items: Vec<Result<_, DomainError>> = match step {
                    Ok(StreamStep::Emit(chunk)) => vec![Ok(chunk)],
                    Ok(StreamStep::Skip) => vec![],
                    Ok(StreamStep::Stop) => return ready(None),
                    Err(e) => {
                        *failed = true;
                        vec![Err(e)]
                    }
                };
                ready(Some(stream::iter(items)))
            })
            .flatten()
            .boxed())
    }
}
