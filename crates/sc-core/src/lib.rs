//! sc-core: shared error type and configuration.
//!
//! This crate is the foundational dependency for the other sc-* crates,
//! providing the unified [`Error`] taxonomy used across the conversion
//! pipeline and HTTP layer, plus the application [`config::Config`].

pub mod config;
pub mod error;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
