use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ContentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    System,
    User,
    Assistant,
    Tool,
}

impl AuthorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other(String),
}

impl FinishReason {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" => Self::Stop,
            "length" | "max_tokens" | "model_length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            "tool_calls" | "tool_use" | "function_call" => Self::ToolCalls,
            _ => Self::Other(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageContent {
    pub role: AuthorRole,
    pub items: Vec<ContentItem>,
    pub name: Option<String>,
    pub model_id: Option<String>,
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatMessageContent {
    pub fn new(role: AuthorRole, items: Vec<ContentItem>) -> Self {
        Self {
            role,
            items,
            name: None,
            model_id: None,
            finish_reason: None,
            metadata: HashMap::new(),
        }
    }

    pub fn text(role: AuthorRole, text: impl Into<String>) -> Self {
        Self::new(role, vec![ContentItem::text(text)])
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Concatenated text of all text items.
    pub fn content(&self) -> Option<String> {
        let texts: Vec<&str> = self.items.iter().filter_map(|i| i.as_text()).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    pub fn is_text_only(&self) -> bool {
        self.items.iter().all(|i| matches!(i, ContentItem::Text(_)))
    }
}

/// One incremental piece of a streamed reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingChatMessageContent {
    pub choice_index: u32,
    pub role: Option<AuthorRole>,
    pub content: Option<String>,
    pub model_id: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl StreamingChatMessageContent {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<ChatMessageContent>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_message(system: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.add_system_message(system);
        history
    }

    pub fn add_message(&mut self, message: ChatMessageContent) {
        self.messages.push(message);
    }

    pub fn add_system_message(&mut self, text: impl Into<String>) {
        self.add_message(ChatMessageContent::text(AuthorRole::System, text));
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.add_message(ChatMessageContent::text(AuthorRole::User, text));
    }

    pub fn add_assistant_message(&mut self, text: impl Into<String>) {
        self.add_message(ChatMessageContent::text(AuthorRole::Assistant, text));
    }

    pub fn messages(&self) -> &[ChatMessageContent] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessageContent> {
        self.messages.last()
    }

    pub fn pop(&mut self) -> Option<ChatMessageContent> {
        self.messages.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
