use anyhow::Result;

use super::super::Container;

const PREVIEW_VALUES: usize = 6;

pub struct EmbedController<'a> {
    container: &'a Container,
}

impl<'a> EmbedController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn embed(&self, texts: Vec<String>) -> Result<String> {
        let service = self.container.embedding_service()?;
        let embeddings = service.generate_embeddings(&texts).await?;

        let mut output = format!("Model: {}\n", service.model_id());
        for (text, embedding) in texts.iter().zip(&embeddings) {
            let preview: Vec<String> = embedding
                .vector()
                .iter()
                .take(PREVIEW_VALUES)
                .map(|v| format!("{v:.4}"))
                .collect();
            output.push_str(&format!(
                "{} ({} dims): [{}{}]\n",
                text,
                embedding.dimensions(),
                preview.join(", "),
                if embedding.dimensions() > PREVIEW_VALUES { ", ..." } else { "" }
            ));
        }
        Ok(output.trim_end().to_string())
    }
}
