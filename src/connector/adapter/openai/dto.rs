//! Wire types for the OpenAI REST API (shared with Azure OpenAI).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AuthorRole, ChatHistory, ChatMessageContent, ContentItem, FinishReason, ModerationResult,
    PromptExecutionSettings, StreamingChatMessageContent,
};

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: Vec<ChatRequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl<'a> ChatRequest<'a> {
    pub fn new(
        model: Option<&'a str>,
        history: &ChatHistory,
        settings: &'a PromptExecutionSettings,
        stream: bool,
    ) -> Self {
        Self {
            model,
            messages: history.messages().iter().map(ChatRequestMessage::from).collect(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            stop: settings.stop_sequences.as_deref(),
            n: (settings.results_per_prompt > 1).then_some(settings.results_per_prompt),
            seed: settings.seed,
            user: settings.user.as_deref(),
            response_format: settings
                .response_format_json
                .then_some(ResponseFormat { kind: "json_object" }),
            stream,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatRequestMessage {
    pub role: &'static str,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Plain string for text-only messages, typed parts otherwise.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl From<&ChatMessageContent> for ChatRequestMessage {
    fn from(message: &ChatMessageContent) -> Self {
        let content = if message.is_text_only() {
            MessageContent::Text(message.content().unwrap_or_default())
        } else {
            MessageContent::Parts(
                message
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::Text(t) => Some(ContentPart::Text {
                            text: t.text.clone(),
                        }),
                        ContentItem::Image(image) => {
                            image.url_or_data_uri().map(|url| ContentPart::ImageUrl {
                                image_url: ImageUrl { url },
                            })
                        }
                        // Audio input goes through the transcription endpoint instead.
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
            name: message.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub id: Option<String>,
    pub created: Option<i64>,
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_messages(self, fallback_model: &str) -> Vec<ChatMessageContent> {
        let model = self.model.unwrap_or_else(|| fallback_model.to_string());
        let usage = self.usage.and_then(|u| serde_json::to_value(u).ok());
        let id = self.id;
        let created = self.created;

        let mut choices = self.choices;
        choices.sort_by_key(|c| c.index);

        choices
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

                let mut message = ChatMessageContent::new(role, items).with_model_id(model.clone());
                if let Some(reason) = choice.finish_reason.as_deref() {
                    message = message.with_finish_reason(FinishReason::parse(reason));
                }
                if let Some(id) = &id {
                    message = message.with_metadata("id", serde_json::json!(id));
                }
                if let Some(created) = created {
                    message = message.with_metadata("created", serde_json::json!(created));
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
pub struct ChatChunk {
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl ChatChunk {
    pub fn into_streaming(self, fallback_model: &str) -> Vec<StreamingChatMessageContent> {
        let model = self.model.unwrap_or_else(|| fallback_model.to_string());
        self.choices
            .into_iter()
            .map(|choice| StreamingChatMessageContent {
                choice_index: choice.index,
                role: choice.delta.role.as_deref().and_then(AuthorRole::parse),
                content: choice.delta.content,
                model_id: Some(model.clone()),
                finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub prompt: &'a str,
    pub n: u32,
    pub size: String,
    pub response_format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    pub data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub url: Option<String>,
    pub b64_json: Option<String>,
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ModerationRequest<'a> {
    pub input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResponse {
    pub results: Vec<ModerationResultDto>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationResultDto {
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeMap<String, Option<bool>>,
    #[serde(default)]
    pub category_scores: BTreeMap<String, Option<f64>>,
}

impl From<ModerationResultDto> for ModerationResult {
    fn from(dto: ModerationResultDto) -> Self {
        Self {
            flagged: dto.flagged,
            categories: dto
                .categories
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or(false)))
                .collect(),
            category_scores: dto
                .category_scores
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or(0.0)))
                .collect(),
        }
    }
}
