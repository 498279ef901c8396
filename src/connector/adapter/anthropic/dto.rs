//! Wire types for the Anthropic Messages API.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthorRole, ChatHistory, ChatMessageContent, ContentItem, DomainError, FinishReason,
    StreamingChatMessageContent,
};

#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<&'a [String]>,
    pub stream: bool,
}

impl<'a> MessagesRequest<'a> {
    /// System turns are lifted out of `messages` and joined into `system`.
    pub fn new(model: &'a str, max_tokens: u32, history: &ChatHistory, stream: bool) -> Self {
        let system: Vec<String> = history
            .messages()
            .iter()
            .filter(|m| m.role == AuthorRole::System)
            .filter_map(|m| m.content())
            .collect();
        let messages = history
            .messages()
            .iter()
            .filter(|m| m.role != AuthorRole::System)
            .map(AnthropicMessage::from)
            .collect();

        Self {
            model,
            max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n")),
            messages,
            temperature: None,
            top_p: None,
            stop_sequences: None,
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnthropicMessage {
    pub role: &'static str,
    pub content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    Text(String),
    Blocks(Vec<RequestBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

impl From<&ChatMessageContent> for AnthropicMessage {
    fn from(message: &ChatMessageContent) -> Self {
        // The API only knows user and assistant turns.
        let role = match message.role {
            AuthorRole::Assistant => "assistant",
            _ => "user",
        };
        let content = if message.is_text_only() {
            AnthropicContent::Text(message.content().unwrap_or_default())
        } else {
            AnthropicContent::Blocks(
                message
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::Text(t) => Some(RequestBlock::Text {
                            text: t.text.clone(),
                        }),
                        ContentItem::Image(image) => {
                            let source = match (&image.data, &image.uri) {
                                (Some(data), _) => ImageSource::Base64 {
                                    media_type: image
                                        .mime_type
                                        .clone()
                                        .unwrap_or_else(|| "image/png".to_string()),
                                    data: BASE64.encode(data),
                                },
                                (None, Some(url)) => ImageSource::Url { url: url.clone() },
                                (None, None) => return None,
                            };
                            Some(RequestBlock::Image { source })
                        }
                        ContentItem::Audio(_) => None,
                    })
                    .collect(),
            )
        };
        Self { role, content }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

impl MessagesResponse {
    pub fn into_message(self, fallback_model: &str) -> ChatMessageContent {
        let role = self
            .role
            .as_deref()
            .and_then(AuthorRole::parse)
            .unwrap_or(AuthorRole::Assistant);
        let items = self
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .map(ContentItem::text)
            .collect();

        let mut message = ChatMessageContent::new(role, items)
            .with_model_id(self.model.unwrap_or_else(|| fallback_model.to_string()));
        if let Some(reason) = self.stop_reason.as_deref() {
            message = message.with_finish_reason(FinishReason::parse(reason));
        }
        if let Some(id) = self.id {
            message = message.with_metadata("id", serde_json::json!(id));
        }
        if let Some(usage) = self.usage.and_then(|u| serde_json::to_value(u).ok()) {
            message = message.with_metadata("usage", usage);
        }
        message
    }
}

/// One `data:` payload of the streaming API, keyed by its `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart { message: StreamMessage },
    ContentBlockStart {},
    ContentBlockDelta { delta: BlockDelta },
    ContentBlockStop {},
    MessageDelta { delta: MessageDeltaBody },
    MessageStop,
    Ping,
    Error { error: StreamError },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub struct StreamMessage {
    pub model: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl StreamError {
    pub fn into_domain(self) -> DomainError {
        let status = match self.kind.as_str() {
            "invalid_request_error" => 400,
            "authentication_error" => 401,
            "permission_error" => 403,
            "not_found_error" => 404,
            "rate_limit_error" => 429,
            "overloaded_error" => 529,
            _ => 500,
        };
        DomainError::service(status, format!("{}: {}", self.kind, self.message))
    }
}

/// What a single stream event contributes to the caller.
#[derive(Debug)]
pub enum StreamStep {
    Emit(StreamingChatMessageContent),
    Skip,
    Stop,
}

impl StreamEvent {
    pub fn into_step(self, model: &str) -> Result<StreamStep, DomainError> {
        let chunk = |content: StreamingChatMessageContent| StreamStep::Emit(StreamingChatMessageContent {
            model_id: content.model_id.or_else(|| Some(model.to_string())),
            ..content
        });
        Ok(match self {
            Self::MessageStart { message } => chunk(StreamingChatMessageContent {
                role: message.role.as_deref().and_then(AuthorRole::parse),
                model_id: message.model,
                ..Default::default()
            }),
            Self::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
            } if !text.is_empty() => chunk(StreamingChatMessageContent {
                content: Some(text),
                ..Default::default()
            }),
            Self::MessageDelta { delta } => match delta.stop_reason {
                Some(reason) => chunk(StreamingChatMessageContent {
                    finish_reason: Some(FinishReason::parse(&reason)),
                    ..Default::default()
                }),
                None => StreamStep::Skip,
            },
            Self::MessageStop => StreamStep::Stop,
            Self::Error { error } => return Err(error.into_domain()),
            _ => StreamStep::Skip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageContent;
    use serde_json::json;

    #[test]
    fn system_messages_are_lifted_into_system_field() {
        let mut history = ChatHistory::with_system_message("Be brief.");
        history.add_user_message("hi");
        history.add_system_message("Answer in French.");

        let value =
            serde_json::to_value(MessagesRequest::new("claude", 1024, &history, false)).unwrap();

        assert_eq!(value["system"], "Be brief.\nAnswer in French.");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "hi"}));
        assert_eq!(value["max_tokens"], 1024);
    }

    #[test]
    fn inline_images_become_base64_sources() {
        let message = ChatMessageContent::new(
            AuthorRole::User,
            vec![ContentItem::Image(ImageContent::from_data(vec![1, 2, 3], "image/jpeg"))],
        );
        let value = serde_json::to_value(AnthropicMessage::from(&message)).unwrap();
        assert_eq!(
            value["content"][0],
            json!({"type": "image", "source": {"type": "base64", "media_type": "image/jpeg", "data": "AQID"}})
        );
    }

    #[test]
    fn response_maps_stop_reason_and_text() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "model": "claude-x",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hello"}],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 3, "output_tokens": 5}
        }))
        .unwrap();

        let message = response.into_message("fallback");
        assert_eq!(message.content().as_deref(), Some("Hello"));
        assert_eq!(message.finish_reason, Some(FinishReason::Length));
        assert_eq!(message.model_id.as_deref(), Some("claude-x"));
        assert_eq!(message.metadata["usage"]["output_tokens"], 5);
    }

    #[test]
    fn stream_events_map_to_steps() {
        let start: StreamEvent = serde_json::from_value(json!({
            "type": "message_start",
            "message": {"id": "m", "model": "claude-x", "role": "assistant", "content": []}
        }))
        .unwrap();
        match start.into_step("fallback").unwrap() {
            StreamStep::Emit(c) => {
                assert_eq!(c.role, Some(AuthorRole::Assistant));
                assert_eq!(c.model_id.as_deref(), Some("claude-x"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let ping: StreamEvent = serde_json::from_value(json!({"type": "ping"})).unwrap();
        assert!(matches!(ping.into_step("m").unwrap(), StreamStep::Skip));

        let stop: StreamEvent = serde_json::from_value(json!({"type": "message_stop"})).unwrap();
        assert!(matches!(stop.into_step("m").unwrap(), StreamStep::Stop));

        let error: StreamEvent = serde_json::from_value(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }))
        .unwrap();
        let err = error.into_step("m").unwrap_err();
        assert_eq!(err.status(), Some(529));
        assert!(err.is_transient());
    }
}
