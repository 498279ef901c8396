use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An image either referenced by URI or carried inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub uri: Option<String>,
    pub data: Option<Vec<u8>>,
    pub mime_type: Option<String>,
}

impl ImageContent {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            data: None,
            mime_type: None,
        }
    }

    pub fn from_data(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            uri: None,
            data: Some(data),
            mime_type: Some(mime_type.into()),
        }
    }

    /// `data:<mime>;base64,<payload>` for inline images, `None` otherwise.
    pub fn data_uri(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let mime = self.mime_type.as_deref().unwrap_or("image/png");
        Some(format!("data:{};base64,{}", mime, BASE64.encode(data)))
    }

    /// The value vendors accept in an `image_url` field.
    pub fn url_or_data_uri(&self) -> Option<String> {
        self.uri.clone().or_else(|| self.data_uri())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioContent {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioContent {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Load audio from disk, guessing the mime type from the extension.
    pub fn from_file(path: &std::path::Path) -> Result<Self, DomainError> {
        let data = std::fs::read(path)?;
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("mp3") => "audio/mpeg",
            Some("wav") => "audio/wav",
            Some("ogg") => "audio/ogg",
            Some("flac") => "audio/flac",
            Some("m4a") => "audio/mp4",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };
        Ok(Self::new(data, mime))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One part of a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text(TextContent),
    Image(ImageContent),
    Audio(AudioContent),
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent::new(text))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            prompt: prompt.into(),
            width,
            height,
        }
    }

    pub fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}
