//! Library context owning providers, names, stored methods and configuration
//!
//! Registries are independent of each other; there is no process-wide
//! instance. Every operation takes `&self` and a registry can be shared
//! across threads behind an `Arc`.

use crate::config::RegistryConfig;
use crate::error::{FetchError, Result, ValidationError};
use crate::name_map::NameMap;
use crate::provider::{Provider, ProviderHandle};
use crate::providers::DefaultProvider;
use crate::store::MethodStore;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Algorithm resolution context
pub struct Registry {
    config: RegistryConfig,
    names: NameMap,
    store: MethodStore,
    providers: RwLock<Vec<ProviderHandle>>,
    /// Bumped on every provider load so known identities are re-queried
    generation: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.provider_names())
            .field("names", &self.names)
            .field("store", &self.store)
            .finish()
    }
}

impl Registry {
    /// Create a registry with no providers loaded
    pub fn new() -> Self {
        Self::with_parts(RegistryConfig {
            load_default_provider: false,
            ..RegistryConfig::default()
        })
    }

    /// Create a registry with the built-in default provider loaded
    pub fn with_default_provider() -> Self {
        let registry = Self::with_parts(RegistryConfig::default());
        registry.install_default_provider();
        registry
    }

    /// Create a registry from configuration
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let registry = Self::with_parts(config);
        registry
            .store
            .set_global_properties(&registry.config.default_properties)?;
        if registry.config.load_default_provider {
            registry.install_default_provider();
        }
        Ok(registry)
    }

    fn with_parts(config: RegistryConfig) -> Self {
        Self {
            store: MethodStore::with_cache_capacity(config.cache_capacity),
            config,
            names: NameMap::new(),
            providers: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn install_default_provider(&self) {
        // A fresh registry has no provider that could clash with the name
        if let Err(e) = self.load_provider(DefaultProvider::new()) {
            debug!("Default provider not loaded: {e}");
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn name_map(&self) -> &NameMap {
        &self.names
    }

    pub fn store(&self) -> &MethodStore {
        &self.store
    }

    /// Load a provider; provider names must be non-empty and unique within a registry
    pub fn load_provider(&self, provider: impl Provider + 'static) -> Result<ProviderHandle> {
        let handle = ProviderHandle::new(provider);
        if handle.name().trim().is_empty() {
            return Err(ValidationError::invalid_parameter("provider name", "must not be empty").into());
        }
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        if providers.iter().any(|loaded| loaded.name() == handle.name()) {
            return Err(FetchError::duplicate_provider(handle.name()).into());
        }
        providers.push(handle.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(providers);

        // Cached resolutions may no longer be the best match
        self.store.flush_cache();
        debug!("Loaded provider '{}'", handle.name());
        Ok(handle)
    }

    /// Loaded providers in load order
    pub fn providers(&self) -> Vec<ProviderHandle> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers()
            .iter()
            .map(|provider| provider.name().to_string())
            .collect()
    }

    /// Find a loaded provider by name
    pub fn find_provider(&self, name: &str) -> Option<ProviderHandle> {
        self.providers()
            .into_iter()
            .find(|provider| provider.name() == name)
    }

    /// Replace the default property query; invalidates every cached resolution
    pub fn set_default_properties(&self, query: &str) -> Result<()> {
        self.store.set_global_properties(query)
    }

    /// Current default property query in canonical form
    pub fn default_properties(&self) -> String {
        self.store.global_properties()
    }

    pub(crate) fn provider_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
