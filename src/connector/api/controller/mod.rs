pub mod chat_controller;
pub mod embed_controller;
pub mod media_controller;
pub mod memory_controller;

pub use chat_controller::ChatController;
pub use embed_controller::EmbedController;
pub use media_controller::MediaController;
pub use memory_controller::MemoryController;
