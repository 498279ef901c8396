//! # Application Layer
//!
//! Service traits implemented by the connectors, and use cases that depend
//! only on those traits.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
