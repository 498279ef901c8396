//! Anthropic Messages API connector.

mod chat_completion;
mod config;
pub mod dto;

pub use chat_completion::*;
pub use config::*;
