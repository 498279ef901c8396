use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::application::ChatCompletionService;
use crate::domain::{
    AuthorRole, ChatHistory, ChatMessageContent, DomainError, PromptExecutionSettings,
};

/// A running conversation with one chat model.
pub struct ChatSessionUseCase {
    service: Arc<dyn ChatCompletionService>,
    settings: PromptExecutionSettings,
    system_prompt: Option<String>,
    history: ChatHistory,
    /// History length before the streamed turn that awaits commit or discard.
    pending_turn: Option<usize>,
}

impl ChatSessionUseCase {
    pub fn new(service: Arc<dyn ChatCompletionService>) -> Self {
        Self {
            service,
            settings: PromptExecutionSettings::default(),
            system_prompt: None,
            history: ChatHistory::new(),
            pending_turn: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.history = ChatHistory::with_system_message(prompt.clone());
        self.system_prompt = Some(prompt);
        self
    }

    pub fn with_settings(mut self, settings: PromptExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Clear the conversation, keeping the system prompt.
    pub fn reset(&mut self) {
        self.history = match &self.system_prompt {
            Some(prompt) => ChatHistory::with_system_message(prompt.clone()),
            None => ChatHistory::new(),
        };
        self.pending_turn = None;
    }

    pub async fn send(&mut self, user_text: &str) -> Result<ChatMessageContent, DomainError> {
        self.discard_streamed_turn();
        let before = self.history.len();
        self.history.add_user_message(user_text);

        let result = self
            .service
            .get_chat_message_contents(&self.history, &self.settings)
            .await
            .and_then(|replies| {
                replies
                    .into_iter()
                    .next()
                    .ok_or_else(|| DomainError::internal("chat service returned no choices"))
            });

        match result {
            Ok(reply) => {
                debug!(
                    "{} replied with {} content items",
                    self.service.model_id(),
                    reply.items.len()
                );
                self.history.add_message(reply.clone());
                Ok(reply)
            }
            Err(e) => {
                warn!("Chat turn failed, rolling back history: {}", e);
                self.history.truncate(before);
                Err(e)
            }
        }
    }

    /// Stream the reply as text deltas of the first choice.
    ///
    /// The user message is appended immediately. Once the stream is drained
    /// call [`Self::commit_streamed_reply`] with the assembled text, or
    /// [`Self::discard_streamed_turn`] if it yielded an error. A turn left
    /// pending is discarded by the next send.
    pub async fn send_streaming(
        &mut self,
        user_text: &str,
    ) -> Result<BoxStream<'static, Result<String, DomainError>>, DomainError> {
        self.discard_streamed_turn();
        let before = self.history.len();
        self.history.add_user_message(user_text);

        let stream = match self
            .service
            .get_streaming_chat_message_contents(&self.history, &self.settings)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                self.history.truncate(before);
                return Err(e);
            }
        };
        self.pending_turn = Some(before);

        Ok(stream
            .filter_map(|chunk| async move {
                match chunk {
                    Ok(c) if c.choice_index == 0 => c.content.map(Ok),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed())
    }

    pub fn commit_streamed_reply(&mut self, text: impl Into<String>) {
        self.pending_turn = None;
        self.history.add_message(
            ChatMessageContent::text(AuthorRole::Assistant, text)
                .with_model_id(self.service.model_id()),
        );
    }

    /// Drop the user message of an uncommitted streamed turn.
    pub fn discard_streamed_turn(&mut self) {
        if let Some(before) = self.pending_turn.take() {
            warn!("Discarding unfinished streamed turn");
            self.history.truncate(before);
        }
    }
}
