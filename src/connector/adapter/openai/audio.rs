use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::dto::{SpeechRequest, TranscriptionResponse};
use super::{OpenAiConfig, OpenAiModelKind};
use crate::application::{AudioToTextService, TextToAudioService};
use crate::connector::http::{ApiClient, Verify};
use crate::domain::{AudioContent, DomainError, TextContent};

pub struct OpenAiTextToAudio {
    client: ApiClient,
    config: OpenAiConfig,
}

impl OpenAiTextToAudio {
    pub fn new(config: OpenAiConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(OpenAiConfig::from_env(OpenAiModelKind::TextToAudio)?)
    }
}

#[async_trait]
impl TextToAudioService for OpenAiTextToAudio {
    async fn generate_audio(&self, text: &str, voice: &str) -> Result<AudioContent, DomainError> {
        Verify::not_empty(text, "text")?;
        Verify::not_empty(voice, "voice")?;

        let request = SpeechRequest {
            model: self.config.request_model(),
            input: text,
            voice,
            response_format: "mp3",
        };
        let bytes = self
            .client
            .post_json_raw(&self.config.path_for("audio/speech"), &request)
            .await?;

        debug!("Received {} bytes of audio", bytes.len());
        Ok(AudioContent::new(bytes.to_vec(), "audio/mpeg"))
    }
}

pub struct OpenAiAudioToText {
    client: ApiClient,
    config: OpenAiConfig,
}

impl OpenAiAudioToText {
    pub fn new(config: OpenAiConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(OpenAiConfig::from_env(OpenAiModelKind::AudioToText)?)
    }
}

#[async_trait]
impl AudioToTextService for OpenAiAudioToText {
    async fn transcribe(
        &self,
        audio: &AudioContent,
        filename: &str,
    ) -> Result<TextContent, DomainError> {
        if audio.is_empty() {
            return Err(DomainError::invalid_input("audio must not be empty"));
        }
        Verify::not_empty(filename, "filename")?;

        let model = self.config.request_model().map(str::to_string);
        let form = || -> Result<Form, DomainError> {
            let part = Part::bytes(audio.data.clone())
                .file_name(filename.to_string())
                .mime_str(&audio.mime_type)
                .map_err(|e| DomainError::invalid_input(format!("invalid audio mime type: {e}")))?;
            let mut form = Form::new().part("file", part);
            if let Some(model) = &model {
                form = form.text("model", model.clone());
            }
            Ok(form)
        };

        let response: TranscriptionResponse = self
            .client
            .post_multipart(&self.config.path_for("audio/transcriptions"), form)
            .await?;
        Ok(TextContent::new(response.text))
    }
}
