use anyhow::Result;
use uuid::Uuid;

use crate::domain::{MemoryQueryResult, MemorySearch};

use super::super::Container;

pub struct MemoryController<'a> {
    container: &'a Container,
}

impl<'a> MemoryController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn save(
        &self,
        collection: String,
        text: String,
        id: Option<String>,
        description: Option<String>,
    ) -> Result<String> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = self
            .container
            .semantic_memory()?
            .save_information(&collection, &text, &id, description, None)
            .await?;
        Ok(format!("Saved '{}' to {}", key, collection))
    }

    pub async fn search(
        &self,
        collection: String,
        query: String,
        options: MemorySearch,
    ) -> Result<String> {
        let results = self
            .container
            .semantic_memory()?
            .search_with(&collection, &query, &options)
            .await?;
        Ok(format_results(&results))
    }

    pub async fn collections(&self) -> Result<String> {
        let collections = self.container.memory_store().get_collections().await?;
        if collections.is_empty() {
            return Ok("No collections.".to_string());
        }
        Ok(collections.join("\n"))
    }
}

fn format_results(results: &[MemoryQueryResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut output = format!("Found {} results:\n\n", results.len());
    for (i, result) in results.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, result.display_line()));
        let metadata = &result.record.metadata;
        if !metadata.description.is_empty() {
            output.push_str(&format!("   {}\n", metadata.description));
        }
        if metadata.is_reference {
            output.push_str(&format!("   -> {}\n", metadata.external_source_name));
        } else {
            output.push_str(&format!("   | {}\n", metadata.text));
        }
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Embedding, MemoryRecord};

    #[test]
    fn formats_local_and_reference_hits() {
        let local = MemoryRecord::local_record(
            "a",
            "the sky is blue",
            Some("colors".to_string()),
            Embedding::default(),
            None,
            None,
            None,
        );
        let reference = MemoryRecord::reference_record(
            "b",
            "GitHub",
            None,
            Embedding::default(),
            None,
            None,
            None,
        );
        let output = format_results(&[
            MemoryQueryResult::new(local, 0.9),
            MemoryQueryResult::new(reference, 0.5),
        ]);

        assert!(output.starts_with("Found 2 results:"));
        assert!(output.contains("1. a (relevance: 0.900)"));
        assert!(output.contains("   colors"));
        assert!(output.contains("   | the sky is blue"));
        assert!(output.contains("   -> GitHub"));
    }

    #[test]
    fn empty_results() {
        assert_eq!(format_results(&[]), "No results found.");
    }
}
