//! # folio-core
//!
//! Core types, traits, and abstractions for the folio note service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the folio database and API crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod upload;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use upload::{
    detect_content_type, storage_key, storage_suffix, validate_payload, DataUri,
};
