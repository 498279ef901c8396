mod chat_session;
mod semantic_memory;

pub use chat_session::*;
pub use semantic_memory::*;
