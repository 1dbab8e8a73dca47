//! Shared domain primitives for keypool
//!
//! Holds the closed provider enumeration with its presets, the
//! HTTP error mapping trait implemented by each feature crate's
//! error type, and credential masking for admin reads.

#![allow(clippy::must_use_candidate)]

mod error;
mod mask;
pub mod provider;

pub use error::HttpError;
pub use mask::mask_secret;
pub use provider::{Provider, ProviderPreset};
