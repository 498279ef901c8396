//! # Domain Layer
//!
//! Shared chat, embedding and memory models plus the crate error type.
//! Nothing here performs I/O or knows about a particular vendor.

mod error;
pub mod models;

pub use error::*;
pub use models::*;
