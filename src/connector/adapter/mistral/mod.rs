//! Mistral chat and embedding connectors.

mod chat_completion;
mod config;
pub mod dto;
mod embedding;

pub use chat_completion::*;
pub use config::*;
pub use embedding::*;
