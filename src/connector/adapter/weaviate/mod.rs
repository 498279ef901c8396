//! Weaviate REST/GraphQL connector.

pub mod dto;
mod memory_store;
mod query;

pub use memory_store::*;
pub use query::*;
