//! Builders for toy dispatch tables

mod dispatch;

pub use dispatch::{DigestTableBuilder, byte_sum, toy_xof, xor_key_exchange};
