//! Typed parameters exchanged with implementation callbacks

use std::collections::BTreeMap;

/// Requested output length of an extendable-output digest
pub const DIGEST_PARAM_XOFLEN: &str = "xoflen";
/// Digest name for S/MIME `micalg` parameters
pub const DIGEST_PARAM_MICALG: &str = "micalg";
/// Provider display name
pub const PROV_PARAM_NAME: &str = "name";
/// Provider version
pub const PROV_PARAM_VERSION: &str = "version";
/// Provider build information
pub const PROV_PARAM_BUILDINFO: &str = "buildinfo";

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Size(usize),
    Int(i64),
    Utf8(String),
    Octets(Vec<u8>),
}

/// Named parameter set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: ParamValue) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a parameter
    pub fn set(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Look up a parameter
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Look up a size parameter
    pub fn get_size(&self, key: &str) -> Option<usize> {
        match self.values.get(key)? {
            ParamValue::Size(n) => Some(*n),
            ParamValue::Int(n) => usize::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Look up a UTF-8 parameter
    pub fn get_utf8(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ParamValue::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Whether a parameter is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Parameter names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether no parameter is present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
