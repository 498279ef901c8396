use serde::{Deserialize, Serialize};

use crate::connector::http::Verify;
use crate::domain::DomainError;

/// Vendor-neutral sampling settings. Each connector maps what it supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptExecutionSettings {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub stop_sequences: Option<Vec<String>>,
    pub results_per_prompt: u32,
    pub seed: Option<i64>,
    pub user: Option<String>,
    pub response_format_json: bool,
}

impl Default for PromptExecutionSettings {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: None,
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
            stop_sequences: None,
            results_per_prompt: 1,
            seed: None,
            user: None,
            response_format_json: false,
        }
    }
}

impl PromptExecutionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop_sequences(mut self, stops: Vec<String>) -> Self {
        self.stop_sequences = Some(stops);
        self
    }

    pub fn with_results_per_prompt(mut self, n: u32) -> Self {
        self.results_per_prompt = n;
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_json_response(mut self) -> Self {
        self.response_format_json = true;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let ranges = [
            (self.temperature, 0.0, 2.0, "temperature"),
            (self.top_p, 0.0, 1.0, "top_p"),
            (self.presence_penalty, -2.0, 2.0, "presence_penalty"),
            (self.frequency_penalty, -2.0, 2.0, "frequency_penalty"),
        ];
        for (value, min, max, name) in ranges {
            if let Some(v) = value {
                Verify::in_range(v, min, max, name)?;
            }
        }

        if self.results_per_prompt < 1 {
            return Err(DomainError::invalid_input(
                "results_per_prompt must be at least 1",
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(DomainError::invalid_input("max_tokens must be at least 1"));
        }
        Ok(())
    }
}
