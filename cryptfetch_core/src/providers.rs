//! Built-in providers

pub mod default;

pub use default::DefaultProvider;
