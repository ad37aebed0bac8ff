//! Test utilities for cryptfetch
//!
//! This crate provides mock providers and toy dispatch tables for testing
//! algorithm resolution and digest contexts without real cryptography.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{DigestTableBuilder, byte_sum, toy_xof, xor_key_exchange};
pub use mocks::{MockProvider, QueryCounter};
