use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::domain::{AudioContent, ImageGenerationRequest};

use super::super::Container;

pub struct MediaController<'a> {
    container: &'a Container,
}

impl<'a> MediaController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn image(
        &self,
        prompt: String,
        width: u32,
        height: u32,
        output: Option<PathBuf>,
    ) -> Result<String> {
        let service = self.container.image_service(output.is_some())?;
        let image = service
            .generate_image(&ImageGenerationRequest::new(prompt, width, height))
            .await?;

        match (output, image.data, image.uri) {
            (Some(path), Some(data), _) => {
                tokio::fs::write(&path, &data)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                Ok(format!("Saved image to {}", path.display()))
            }
            (_, _, Some(uri)) => Ok(uri),
            _ => bail!("provider returned neither image data nor a URL"),
        }
    }

    pub async fn speak(&self, text: String, voice: String, output: PathBuf) -> Result<String> {
        let audio = self
            .container
            .speech_service()?
            .generate_audio(&text, &voice)
            .await?;
        tokio::fs::write(&output, &audio.data)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(format!(
            "Saved {} bytes of {} to {}",
            audio.len(),
            audio.mime_type,
            output.display()
        ))
    }

    pub async fn transcribe(&self, file: PathBuf) -> Result<String> {
        let audio = AudioContent::from_file(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let text = self
            .container
            .transcription_service()?
            .transcribe(&audio, &filename)
            .await?;
        Ok(text.text)
    }

    pub async fn moderate(&self, texts: Vec<String>) -> Result<String> {
        let results = self
            .container
            .moderation_service()?
            .moderate(&texts)
            .await?;

        let lines: Vec<String> = texts
            .iter()
            .zip(&results)
            .map(|(text, result)| {
                if result.flagged {
                    format!("FLAGGED  {} [{}]", text, result.flagged_categories().join(", "))
                } else {
                    format!("ok       {}", text)
                }
            })
            .collect();
        Ok(lines.join("\n"))
    }
}
