//! # Connector Layer
//!
//! Implementations of the application traits:
//! - `http`: shared client, retry, SSE and argument checks
//! - `adapter`: OpenAI/Azure, Mistral, Anthropic, Qdrant, Weaviate and local adapters
//! - `api`: CLI wiring (container, router, controllers)

pub mod adapter;
pub mod api;
pub mod http;

pub use adapter::*;
pub use http::*;
