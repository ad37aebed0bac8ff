//! Mock provider with a fixed algorithm table and an observable query count

use cryptfetch_core::{
    Algorithm, DigestFunction, Implementation, KeyExchangeFunction, OperationId, Params,
    Provider, params::PROV_PARAM_NAME, params::ParamValue,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared view of how often a [`MockProvider`] was queried.
///
/// Clone it before handing the provider to a registry; the registry owns the
/// provider afterwards.
#[derive(Debug, Clone, Default)]
pub struct QueryCounter(Arc<AtomicUsize>);

impl QueryCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Provider serving whatever algorithms a test registers
pub struct MockProvider {
    name: String,
    algorithms: BTreeMap<OperationId, Vec<Algorithm>>,
    queries: QueryCounter,
}

impl MockProvider {
    /// Create a mock provider without algorithms
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            algorithms: BTreeMap::new(),
            queries: QueryCounter::default(),
        }
    }

    /// Add an algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithms
            .entry(algorithm.implementation.operation())
            .or_default()
            .push(algorithm);
        self
    }

    /// Add a digest from its dispatch table
    pub fn with_digest(self, names: &str, properties: &str, functions: Vec<DigestFunction>) -> Self {
        self.with_algorithm(Algorithm::new(
            names,
            properties,
            Implementation::Digest(functions),
        ))
    }

    /// Add a key exchange from its dispatch table
    pub fn with_key_exchange(
        self,
        names: &str,
        properties: &str,
        functions: Vec<KeyExchangeFunction>,
    ) -> Self {
        self.with_algorithm(Algorithm::new(
            names,
            properties,
            Implementation::KeyExchange(functions),
        ))
    }

    /// Counter of `query_operation` calls, shared with this provider
    pub fn query_counter(&self) -> QueryCounter {
        self.queries.clone()
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_operation(&self, operation: OperationId) -> Option<&[Algorithm]> {
        self.queries.increment();
        self.algorithms.get(&operation).map(Vec::as_slice)
    }

    fn params(&self) -> Params {
        Params::new().with(PROV_PARAM_NAME, ParamValue::Utf8(format!("mock {}", self.name)))
    }
}
