//! cryptfetch core library
//!
//! Providers offer algorithm implementations as dispatch tables; a
//! [`Registry`] resolves `(operation, name, property query)` to a method
//! object, constructing it at most once per provider and caching the
//! resolution. Digests are driven through [`DigestContext`].
//!
//! ```no_run
//! use cryptfetch_core::{DigestContext, Registry};
//!
//! # fn main() -> cryptfetch_core::Result<()> {
//! let registry = Registry::with_default_provider();
//! let sha256 = registry.fetch_digest("SHA2-256", None)?;
//! let mut ctx = DigestContext::new();
//! ctx.init(&sha256)?;
//! ctx.update(b"abc")?;
//! let digest = ctx.finalize_to_vec()?;
//! assert_eq!(digest.len(), 32);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod digest;
pub mod dispatch;
pub mod error;
pub mod exchange;
pub mod fetch;
pub mod method;
pub mod name_map;
pub mod params;
pub mod property;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod store;

// Re-export main types
pub use config::{ConfigLoader, RegistryConfig};
pub use digest::{
    ContextFlags, ContextState, DigestContext, DigestFlags, DigestMethod, LegacyDigest,
    ProvidedDigest, digest_oneshot,
};
pub use dispatch::{DigestFunction, KeyExchangeFunction, ProviderContext};
pub use error::{Error, Result};
pub use exchange::{KeyExchangeContext, KeyExchangeMethod};
pub use fetch::AlgorithmInfo;
pub use method::{ConstructionError, FetchableMethod, MethodId, OperationId};
pub use name_map::{NameId, NameMap};
pub use params::{ParamValue, Params};
pub use property::{PropertyDefinition, PropertyQuery, PropertyValue};
pub use provider::{Algorithm, Implementation, Provider, ProviderHandle};
pub use providers::DefaultProvider;
pub use registry::Registry;
pub use store::MethodStore;
