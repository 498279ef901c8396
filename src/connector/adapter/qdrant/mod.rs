//! Qdrant REST connector and memory store.

mod client;
pub mod dto;
mod memory_store;

pub use client::*;
pub use memory_store::*;
