//! Wire types for the Mistral La Plateforme API.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthorRole, ChatHistory, ChatMessageContent, ContentItem, FinishReason,
    PromptExecutionSettings, StreamingChatMessageContent,
};

#[derive(Debug, Serialize)]
pub struct MistralChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<MistralMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<MistralResponseFormat>,
    pub safe_prompt: bool,
    pub stream: bool,
}

impl<'a> MistralChatRequest<'a> {
    pub fn new(
        model: &'a str,
        history: &ChatHistory,
        settings: &'a PromptExecutionSettings,
        safe_prompt: bool,
        stream: bool,
    ) -> Self {
        Self {
            model,
            messages: history.messages().iter().map(MistralMessage::from).collect(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
            stop: settings.stop_sequences.as_deref(),
            random_seed: settings.seed,
            n: (settings.results_per_prompt > 1).then_some(settings.results_per_prompt),
            response_format: settings
                .response_format_json
                .then_some(MistralResponseFormat { kind: "json_object" }),
            safe_prompt,
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MistralResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MistralMessage {
    pub role: &'static str,
    pub content: MistralContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MistralContent {
    Text(String),
    Chunks(Vec<MistralChunk>),
}

/// Mistral takes `image_url` as a bare string, unlike OpenAI's object.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MistralChunk {
    Text { text: String },
    ImageUrl { image_url: String },
}

impl From<&ChatMessageContent> for MistralMessage {
    fn from(message: &ChatMessageContent) -> Self {
        let content = if message.is_text_only() {
            MistralContent::Text(message.content().unwrap_or_default())
        } else {
            MistralContent::Chunks(
                message
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::Text(t) => Some(MistralChunk::Text {
                            text: t.text.clone(),
                        }),
                        ContentItem::Image(image) => image
                            .url_or_data_uri()
                            .map(|image_url| MistralChunk::ImageUrl { image_url }),
                        ContentItem::Audio(_) => None,
                    })
                    .collect(),
            )
        };
        Self {
            role: match message.role {
                // Tool results need a tool_call_id the history doesn't carry.
                AuthorRole::Tool => AuthorRole::User.as_str(),
                role => role.as_str(),
            },
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct MistralChatResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    pub choices: Vec<MistralChoice>,
    pub usage: Option<MistralUsage>,
}

#[derive(Debug, Deserialize)]
pub struct MistralChoice {
    #[serde(default)]
    pub index: u32,
    pub message: MistralResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MistralResponseMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl MistralChatResponse {
    pub fn into_messages(self, fallback_model: &str) -> Vec<ChatMessageContent> {
        let model = self.model.unwrap_or_else(|| fallback_model.to_string());
        let usage = self.usage.and_then(|u| serde_json::to_value(u).ok());
        let id = self.id;

        self.choices
            .into_iter()
            .map(|choice| {
                let role = choice
                    .message
                    .role
                    .as_deref()
                    .and_then(AuthorRole::parse)
                    .unwrap_or(AuthorRole::Assistant);
                let items = choice
                    .message
                    .content
                    .map(|c| vec![ContentItem::text(c)])
                    .unwrap_or_default();

                let mut message = ChatMessageContent::new(role, items)
                    .with_model_id(model.clone())
                    .with_metadata("choice_index", serde_json::json!(choice.index));
                if let Some(reason) = choice.finish_reason.as_deref() {
                    message = message.with_finish_reason(FinishReason::parse(reason));
                }
                if let Some(id) = &id {
                    message = message.with_metadata("id", serde_json::json!(id));
                }
                if let Some(usage) = &usage {
                    message = message.with_metadata("usage", usage.clone());
                }
                message
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct MistralChatChunk {
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<MistralChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct MistralChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: MistralDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MistralDelta {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl MistralChatChunk {
    pub fn into_streaming(self, fallback_model: &str) -> Vec<StreamingChatMessageContent> {
        let model = self.model.unwrap_or_else(|| fallback_model.to_string());
        self.choices
            .into_iter()
            .map(|choice| StreamingChatMessageContent {
                choice_index: choice.index,
                role: choice.delta.role.as_deref().and_then(AuthorRole::parse),
                content: choice.delta.content.filter(|c| !c.is_empty()),
                model_id: Some(model.clone()),
                finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct MistralEmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
    pub encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct MistralEmbeddingResponse {
    pub data: Vec<MistralEmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct MistralEmbeddingData {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}
