//! Mock implementations for testing

mod provider;

pub use provider::{MockProvider, QueryCounter};
