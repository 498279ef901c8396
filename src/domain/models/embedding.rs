use serde::{Deserialize, Serialize};

/// A dense vector produced by an embedding model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    vector: Vec<f32>,
}

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn into_vector(self) -> Vec<f32> {
        self.vector
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    pub fn dot_product(&self, other: &Embedding) -> f32 {
        self.vector
            .iter()
            .zip(other.vector.iter())
            .map(|(x, y)| x * y)
            .sum()
    }

    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.vector.len() != other.vector.len() {
            return 0.0;
        }

        let norm_a: f32 = self.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.vector.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        self.dot_product(other) / (norm_a * norm_b)
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self::new(vector)
    }
}
