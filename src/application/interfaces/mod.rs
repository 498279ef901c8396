mod chat_completion_service;
mod embedding_service;
mod media_service;
mod memory_store;

pub use chat_completion_service::*;
pub use embedding_service::*;
pub use media_service::*;
pub use memory_store::*;
