//! # famlog-core
//!
//! Core types, traits, and abstractions for the famlog extraction pipeline.
//!
//! This crate provides the value objects (`ExtractionTask`,
//! `ExtractionResult`, `BackendDescriptor`), the error type, and the trait
//! seams (`BackendAdapter`, `MediaSource`, `CredentialProvider`) that the
//! extraction crate implements.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, FailureKind, Result};
pub use models::*;
pub use traits::*;
