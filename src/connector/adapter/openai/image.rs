use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::dto::{ImageRequest, ImageResponse};
use super::{OpenAiConfig, OpenAiModelKind};
use crate::application::TextToImageService;
use crate::connector::http::{ApiClient, Verify};
use crate::domain::{DomainError, ImageContent, ImageGenerationRequest};

const SUPPORTED_SIZES: &[(u32, u32)] = &[
    (256, 256),
    (512, 512),
    (1024, 1024),
    (1792, 1024),
    (1024, 1792),
];

pub struct OpenAiTextToImage {
    client: ApiClient,
    config: OpenAiConfig,
    inline_data: bool,
}

impl OpenAiTextToImage {
    pub fn new(config: OpenAiConfig) -> Result<Self, DomainError> {
        let client = config.build_client()?;
        Ok(Self {
            client,
            config,
            inline_data: false,
        })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Self::new(OpenAiConfig::from_env(OpenAiModelKind::TextToImage)?)
    }

    /// Request base64 image bytes instead of a hosted URL.
    pub fn with_inline_data(mut self) -> Self {
        self.inline_data = true;
        self
    }
}

#[async_trait]
impl TextToImageService for OpenAiTextToImage {
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageContent, DomainError> {
        Verify::not_empty(&request.prompt, "prompt")?;
        if !SUPPORTED_SIZES.contains(&(request.width, request.height)) {
            return Err(DomainError::invalid_input(format!(
                "unsupported image size {}",
                request.size()
            )));
        }

        let body = ImageRequest {
            model: self.config.request_model(),
            prompt: &request.prompt,
            n: 1,
            size: request.size(),
            response_format: if self.inline_data { "b64_json" } else { "url" },
        };
        let response: ImageResponse = self
            .client
            .post_json(&self.config.path_for("images/generations"), &body)
            .await?;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("image service returned no images"))?;

        if let Some(b64) = image.b64_json {
            let bytes = BASE64
                .decode(b64.as_bytes())
                .map_err(|e| DomainError::parse(format!("invalid base64 image: {e}")))?;
            return Ok(ImageContent::from_data(bytes, "image/png"));
        }
        image
            .url
            .map(ImageContent::from_uri)
            .ok_or_else(|| DomainError::parse("image response carried neither url nor data"))
    }
}
