//! Method resolution
//!
//! `fetch` answers "give me an implementation of NAME for OPERATION matching
//! QUERY". It consults the query cache, then the store, and only when the
//! store has not seen the current set of providers for the name does it ask
//! the providers and construct new methods. Construction goes through the
//! operation's [`FetchableMethod::from_dispatch`] adapter.

use crate::digest::legacy;
use crate::digest::DigestMethod;
use crate::error::{FetchError, InternalError, Result};
use crate::exchange::KeyExchangeMethod;
use crate::method::{FetchableMethod, MethodId, OperationId};
use crate::property::{PropertyDefinition, PropertyQuery};
use crate::provider::{Algorithm, ProviderHandle};
use crate::registry::Registry;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

/// One row of an algorithm listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    /// Primary name
    pub name: String,
    /// Every alias, primary name first
    pub aliases: Vec<String>,
    /// Name of the provider offering the implementation
    pub provider: String,
    /// Property definition of the implementation
    pub properties: String,
}

impl Registry {
    /// Resolve a method by name and optional property query.
    ///
    /// `None` and `""` both mean "no call-site preference"; the registry's
    /// default properties still apply. A name no loaded provider offers
    /// yields [`FetchError::Unsupported`].
    ///
    /// # Panics
    ///
    /// If `M::OPERATION` is 0 or does not fit a method identity.
    pub fn fetch<M: FetchableMethod>(&self, name: &str, properties: Option<&str>) -> Result<M> {
        let operation = M::OPERATION;
        assert!(
            operation.get() > 0 && operation.get() <= OperationId::MAX,
            "operation id {} out of range",
            operation.get()
        );
        let query_key = properties.unwrap_or("");

        let mut id = self.identity_of(operation, name)?;
        if let Some(method) = self.store().cache_get::<M>(id, query_key) {
            return Ok(method);
        }

        let query = PropertyQuery::parse(query_key)?;
        let generation = self.provider_generation();
        if !self.store().is_populated(id, generation) {
            id = self.populate::<M>(name, generation)?;
        }

        match self.store().fetch::<M>(id, &query) {
            Some(method) => {
                self.store().cache_set(id, query_key, &method);
                trace!("Resolved {operation} '{name}' with '{query_key}' to {id}");
                Ok(method)
            }
            None => {
                debug!("No {operation} implementation of '{name}' matches '{query_key}'");
                Err(FetchError::unsupported(operation, name).into())
            }
        }
    }

    /// Identity for a known name; [`MethodId::INVALID`] if never registered
    fn identity_of(&self, operation: OperationId, name: &str) -> Result<MethodId> {
        let name_id = self.name_map().name_to_id(name);
        if name_id == 0 {
            return Ok(MethodId::INVALID);
        }
        let id = MethodId::pack(operation, name_id);
        if !id.is_valid() {
            return Err(InternalError::identity_exhausted(operation, name).into());
        }
        Ok(id)
    }

    /// Register the names of every algorithm offered for the operation, then
    /// store newly constructed candidates sharing the identity of `name`.
    ///
    /// Returns the identity of the name, invalid if no provider knows it.
    fn populate<M: FetchableMethod>(&self, name: &str, generation: u64) -> Result<MethodId> {
        let operation = M::OPERATION;
        let providers = self.providers();

        let mut offered = Vec::new();
        for provider in &providers {
            let Some(algorithms) = provider.query_operation(operation) else {
                continue;
            };
            for algorithm in algorithms.iter().filter(|a| !a.primary_name().is_empty()) {
                let name_id = self.name_map().add_aliases(&algorithm.names);
                if !MethodId::pack(operation, name_id).is_valid() {
                    let error = InternalError::identity_exhausted(operation, &algorithm.names);
                    return Err(error.into());
                }
                offered.push((provider, algorithm, name_id));
            }
        }

        let id = self.identity_of(operation, name)?;
        if !id.is_valid() {
            return Ok(MethodId::INVALID);
        }
        let target = self.name_map().name_to_id(name);
        for (provider, algorithm, _) in offered.iter().filter(|(_, _, n)| *n == target) {
            self.store_candidate::<M>(id, provider, algorithm);
        }
        self.store().mark_populated(id, generation);
        Ok(id)
    }

    fn store_candidate<M: FetchableMethod>(
        &self,
        id: MethodId,
        provider: &ProviderHandle,
        algorithm: &Algorithm,
    ) {
        let definition = match PropertyDefinition::parse(&algorithm.properties) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(
                    "Ignoring '{}' from provider '{}': {e}",
                    algorithm.names,
                    provider.name()
                );
                return;
            }
        };
        if self.store().contains(id, &definition) {
            return;
        }
        match M::from_dispatch(algorithm.primary_name(), &algorithm.implementation, provider) {
            Ok(method) => {
                debug!(
                    "Constructed {} '{}' from provider '{}'",
                    M::OPERATION,
                    algorithm.primary_name(),
                    provider.name()
                );
                self.store().add(id, definition, method);
            }
            Err(e) => warn!(
                "Discarding '{}' from provider '{}': {e}",
                algorithm.names,
                provider.name()
            ),
        }
    }

    /// Resolve a provided digest
    pub fn fetch_digest(&self, name: &str, properties: Option<&str>) -> Result<DigestMethod> {
        self.fetch::<DigestMethod>(name, properties)
    }

    /// Resolve a provided key-exchange method
    pub fn fetch_key_exchange(
        &self,
        name: &str,
        properties: Option<&str>,
    ) -> Result<KeyExchangeMethod> {
        self.fetch::<KeyExchangeMethod>(name, properties)
    }

    /// Resolve a digest, falling back to a legacy built-in of the same name
    /// when no provider offers it and the fallback is enabled
    pub fn get_digest(&self, name: &str, properties: Option<&str>) -> Result<DigestMethod> {
        match self.fetch_digest(name, properties) {
            Err(e) if e.is_unsupported() && self.config().legacy_fallback => {
                match legacy::find_builtin(name) {
                    Some(builtin) => {
                        trace!("Using legacy built-in for '{name}'");
                        Ok(DigestMethod::Legacy(builtin))
                    }
                    None => Err(e),
                }
            }
            result => result,
        }
    }

    fn for_each_candidate<M: FetchableMethod>(
        &self,
        mut visit: impl FnMut(&ProviderHandle, &Algorithm, M),
    ) {
        for provider in self.providers() {
            let Some(algorithms) = provider.query_operation(M::OPERATION) else {
                continue;
            };
            for algorithm in algorithms {
                match M::from_dispatch(algorithm.primary_name(), &algorithm.implementation, &provider)
                {
                    Ok(method) => visit(&provider, algorithm, method),
                    Err(e) => debug!(
                        "Skipping '{}' from provider '{}': {e}",
                        algorithm.names,
                        provider.name()
                    ),
                }
            }
        }
    }

    /// Construct every algorithm of `M`'s operation from every provider and
    /// hand it to `visit(provider, name, method)`. Nothing is stored.
    pub fn enumerate_all<M: FetchableMethod>(&self, mut visit: impl FnMut(&ProviderHandle, &str, &M)) {
        self.for_each_candidate::<M>(|provider, algorithm, method| {
            visit(provider, algorithm.primary_name(), &method)
        });
    }

    /// Constructible algorithms of `M`'s operation, sorted by name
    /// (case-insensitive) and then provider name
    pub fn list_algorithms<M: FetchableMethod>(&self) -> Vec<AlgorithmInfo> {
        let mut listing = Vec::new();
        self.for_each_candidate::<M>(|provider, algorithm, _method| {
            listing.push(AlgorithmInfo {
                name: algorithm.primary_name().to_string(),
                aliases: algorithm.aliases().into_iter().map(String::from).collect(),
                provider: provider.name().to_string(),
                properties: algorithm.properties.clone(),
            });
        });
        listing.sort_by(|a, b| {
            a.name
                .to_ascii_lowercase()
                .cmp(&b.name.to_ascii_lowercase())
                .then_with(|| a.provider.cmp(&b.provider))
        });
        listing
    }

    /// Sorted listing of every constructible digest
    pub fn list_digests(&self) -> Vec<AlgorithmInfo> {
        self.list_algorithms::<DigestMethod>()
    }
}
