//! Provider abstraction
//!
//! A provider is a named bundle of algorithm implementations. The registry
//! queries it per operation kind and turns the returned dispatch tables into
//! method objects. Every method keeps its provider alive and is counted on the
//! provider handle, so tests and diagnostics can verify that every constructed
//! method is eventually released.

use crate::dispatch::{DigestFunction, KeyExchangeFunction};
use crate::method::OperationId;
use crate::name_map::split_aliases;
use crate::params::{PROV_PARAM_NAME, ParamValue, Params};
use log::trace;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Dispatch table for one algorithm, tagged with its operation kind
#[derive(Clone, Debug)]
pub enum Implementation {
    Digest(Vec<DigestFunction>),
    KeyExchange(Vec<KeyExchangeFunction>),
}

impl Implementation {
    /// Operation kind the table implements
    pub fn operation(&self) -> OperationId {
        match self {
            Self::Digest(_) => OperationId::DIGEST,
            Self::KeyExchange(_) => OperationId::KEYEXCH,
        }
    }
}

/// One algorithm offered by a provider
#[derive(Clone, Debug)]
pub struct Algorithm {
    /// Colon separated aliases, primary name first
    pub names: String,
    /// Property definition string, for example `provider=default,fips=no`
    pub properties: String,
    pub implementation: Implementation,
}

impl Algorithm {
    pub fn new(names: &str, properties: &str, implementation: Implementation) -> Self {
        Self {
            names: names.to_string(),
            properties: properties.to_string(),
            implementation,
        }
    }

    /// First alias of the name list
    pub fn primary_name(&self) -> &str {
        split_aliases(&self.names).next().unwrap_or("")
    }

    /// All aliases of the name list
    pub fn aliases(&self) -> Vec<&str> {
        split_aliases(&self.names).collect()
    }

    /// Whether `name` is one of the aliases (case-insensitive)
    pub fn has_name(&self, name: &str) -> bool {
        let name = name.trim();
        split_aliases(&self.names).any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// A source of algorithm implementations
pub trait Provider: Send + Sync {
    /// Unique provider name
    fn name(&self) -> &str;

    /// Algorithms offered for an operation kind, `None` if the kind is unsupported
    fn query_operation(&self, operation: OperationId) -> Option<&[Algorithm]>;

    /// Provider-level parameters (name, version, build information)
    fn params(&self) -> Params {
        Params::new().with(PROV_PARAM_NAME, ParamValue::Utf8(self.name().to_string()))
    }
}

struct ProviderInner {
    provider: Box<dyn Provider>,
    methods_constructed: AtomicUsize,
    methods_released: AtomicUsize,
}

/// Shared handle to a loaded provider
#[derive(Clone)]
pub struct ProviderHandle {
    inner: Arc<ProviderInner>,
}

impl ProviderHandle {
    /// Wrap a provider in a shareable handle
    pub fn new(provider: impl Provider + 'static) -> Self {
        Self::from_boxed(Box::new(provider))
    }

    pub fn from_boxed(provider: Box<dyn Provider>) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                provider,
                methods_constructed: AtomicUsize::new(0),
                methods_released: AtomicUsize::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.provider.name()
    }

    pub fn query_operation(&self, operation: OperationId) -> Option<&[Algorithm]> {
        self.inner.provider.query_operation(operation)
    }

    pub fn params(&self) -> Params {
        self.inner.provider.params()
    }

    /// Number of method objects built from this provider so far
    pub fn methods_constructed(&self) -> usize {
        self.inner.methods_constructed.load(Ordering::Acquire)
    }

    /// Number of method objects built from this provider that were destroyed
    pub fn methods_released(&self) -> usize {
        self.inner.methods_released.load(Ordering::Acquire)
    }

    /// Method objects currently alive
    pub fn live_methods(&self) -> usize {
        self.methods_constructed()
            .saturating_sub(self.methods_released())
    }

    /// Whether two handles refer to the same loaded provider
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Record the construction of a method; the binding records its release
    pub(crate) fn bind_method(&self, algorithm: &str) -> MethodBinding {
        self.inner
            .methods_constructed
            .fetch_add(1, Ordering::AcqRel);
        trace!("Constructed method '{algorithm}' from provider '{}'", self.name());
        MethodBinding {
            provider: self.clone(),
        }
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.name())
            .field("live_methods", &self.live_methods())
            .finish()
    }
}

/// Link from a method object to the provider it came from.
///
/// Keeps the provider alive and counts the method as released on drop.
pub(crate) struct MethodBinding {
    provider: ProviderHandle,
}

impl MethodBinding {
    pub(crate) fn provider(&self) -> &ProviderHandle {
        &self.provider
    }
}

impl Drop for MethodBinding {
    fn drop(&mut self) {
        self.provider
            .inner
            .methods_released
            .fetch_add(1, Ordering::AcqRel);
    }
}
