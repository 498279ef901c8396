//! HTTP plumbing shared by all vendor connectors.

mod client;
mod retry;
mod sse;
mod validation;

pub use client::*;
pub use retry::*;
pub use sse::*;
pub use validation::*;
