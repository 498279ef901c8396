use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::application::TextEmbeddingService;
use crate::domain::{DomainError, Embedding};

const MODEL_ID: &str = "mock-embedding";

/// Deterministic embeddings for tests and offline runs: the same text always
/// yields the same unit-length vector.
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn generate_vector(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);

        let mut rng = rand::rngs::StdRng::seed_from_u64(u64::from_le_bytes(seed));
        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }

        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextEmbeddingService for MockEmbedding {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Embedding>, DomainError> {
        let results: Vec<Embedding> = texts
            .iter()
            .map(|text| Embedding::new(self.generate_vector(text)))
            .collect();

        debug!("Generated {} mock embeddings", results.len());

        Ok(results)
    }
}
