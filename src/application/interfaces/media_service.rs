use async_trait::async_trait;

use crate::domain::{
    AudioContent, DomainError, ImageContent, ImageGenerationRequest, ModerationResult,
    TextContent,
};

#[async_trait]
pub trait TextToImageService: Send + Sync {
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageContent, DomainError>;
}

#[async_trait]
pub trait TextToAudioService: Send + Sync {
    async fn generate_audio(&self, text: &str, voice: &str) -> Result<AudioContent, DomainError>;
}

#[async_trait]
pub trait AudioToTextService: Send + Sync {
    /// `filename` is forwarded to the vendor, which uses its extension to pick a decoder.
    async fn transcribe(
        &self,
        audio: &AudioContent,
        filename: &str,
    ) -> Result<TextContent, DomainError>;
}

/// Classifies text against a vendor's content policy.
#[async_trait]
pub trait ModerationService: Send + Sync {
    async fn moderate(&self, inputs: &[String]) -> Result<Vec<ModerationResult>, DomainError>;
}
