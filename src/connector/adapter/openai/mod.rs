//! OpenAI and Azure OpenAI connectors. Both speak the same wire format and
//! differ only in URL layout and auth, which [`OpenAiConfig`] captures.

mod audio;
mod chat_completion;
mod config;
pub mod dto;
mod embedding;
mod image;
mod moderation;

pub use audio::*;
pub use chat_completion::*;
pub use config::*;
pub use embedding::*;
pub use image::*;
pub use moderation::*;
