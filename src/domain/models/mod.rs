mod chat;
mod content;
mod embedding;
mod memory_record;
mod moderation;
mod settings;

pub use chat::*;
pub use content::*;
pub use embedding::*;
pub use memory_record::*;
pub use moderation::*;
pub use settings::*;
