//! Key-exchange methods
//!
//! The core does not implement any key agreement. It validates provider
//! dispatch tables, caches the resulting methods like any other fetchable
//! method and drives them through [`KeyExchangeContext`].

use crate::dispatch::{
    DupCtxFn, FreeCtxFn, KeyExchangeDeriveFn, KeyExchangeFunction, KeyExchangeInitFn,
    KeyExchangeSetPeerFn, NewCtxFn, ProviderContext, SetCtxParamsFn,
};
use crate::error::{Error, ImplementationError, Result};
use crate::method::{ConstructionError, FetchableMethod, OperationId};
use crate::params::Params;
use crate::provider::{Implementation, MethodBinding, ProviderHandle};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

struct KeyExchangeInner {
    name: String,
    newctx: NewCtxFn,
    init: KeyExchangeInitFn,
    derive: KeyExchangeDeriveFn,
    freectx: FreeCtxFn,
    set_peer: Option<KeyExchangeSetPeerFn>,
    dupctx: Option<DupCtxFn>,
    set_params: Option<SetCtxParamsFn>,
    binding: MethodBinding,
}

/// A resolved key-exchange algorithm
#[derive(Clone)]
pub struct KeyExchangeMethod(Arc<KeyExchangeInner>);

impl KeyExchangeMethod {
    /// Validate a key-exchange dispatch table.
    ///
    /// `newctx`, `init`, `derive` and `freectx` are required; `set_peer`,
    /// `dupctx` and `set_params` are optional. The first occurrence of a
    /// function wins.
    pub fn from_functions(
        name: &str,
        functions: &[KeyExchangeFunction],
        provider: &ProviderHandle,
    ) -> std::result::Result<Self, ConstructionError> {
        let mut newctx = None;
        let mut init = None;
        let mut derive = None;
        let mut freectx = None;
        let mut set_peer = None;
        let mut dupctx = None;
        let mut set_params = None;

        for function in functions {
            match function {
                KeyExchangeFunction::NewCtx(f) => {
                    newctx.get_or_insert_with(|| f.clone());
                }
                KeyExchangeFunction::Init(f) => {
                    init.get_or_insert_with(|| f.clone());
                }
                KeyExchangeFunction::Derive(f) => {
                    derive.get_or_insert_with(|| f.clone());
                }
                KeyExchangeFunction::FreeCtx(f) => {
                    freectx.get_or_insert_with(|| f.clone());
                }
                KeyExchangeFunction::SetPeer(f) => {
                    set_peer.get_or_insert_with(|| f.clone());
                }
                KeyExchangeFunction::DupCtx(f) => {
                    dupctx.get_or_insert_with(|| f.clone());
                }
                KeyExchangeFunction::SetParams(f) => {
                    set_params.get_or_insert_with(|| f.clone());
                }
            }
        }

        let (Some(newctx), Some(init), Some(derive), Some(freectx)) = (newctx, init, derive, freectx)
        else {
            return Err(ConstructionError::IncompleteDispatch(
                "key exchange needs newctx, init, derive and freectx".to_string(),
            ));
        };

        Ok(Self(Arc::new(KeyExchangeInner {
            name: name.to_string(),
            newctx,
            init,
            derive,
            freectx,
            set_peer,
            dupctx,
            set_params,
            binding: provider.bind_method(name),
        })))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn provider(&self) -> &ProviderHandle {
        self.0.binding.provider()
    }

    pub fn supports_peer(&self) -> bool {
        self.0.set_peer.is_some()
    }

    pub fn supports_copy(&self) -> bool {
        self.0.dupctx.is_some()
    }

    /// Number of live references to this method
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl FetchableMethod for KeyExchangeMethod {
    const OPERATION: OperationId = OperationId::KEYEXCH;

    fn from_dispatch(
        name: &str,
        implementation: &Implementation,
        provider: &ProviderHandle,
    ) -> std::result::Result<Self, ConstructionError> {
        match implementation {
            Implementation::KeyExchange(functions) => Self::from_functions(name, functions, provider),
            other => Err(ConstructionError::WrongOperation {
                expected: Self::OPERATION,
                found: other.operation(),
            }),
        }
    }

    fn name(&self) -> &str {
        KeyExchangeMethod::name(self)
    }

    fn provider(&self) -> Option<&ProviderHandle> {
        Some(KeyExchangeMethod::provider(self))
    }

    fn same_method(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for KeyExchangeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyExchangeMethod({} from {})", self.name(), self.provider().name())
    }
}

/// Key agreement in progress with one key-exchange method
pub struct KeyExchangeContext {
    method: KeyExchangeMethod,
    ctx: Option<ProviderContext>,
}

impl KeyExchangeContext {
    /// Create a context and bind the local key (raw encoding)
    pub fn new(method: &KeyExchangeMethod, key: &[u8]) -> Result<Self> {
        let mut ctx = (method.0.newctx)().ok_or_else(|| {
            Error::implementation(method.name(), ImplementationError::new("provider returned no context"))
        })?;
        if let Err(e) = (method.0.init)(&mut ctx, key) {
            (method.0.freectx)(ctx);
            return Err(Error::implementation(method.name(), e));
        }
        Ok(Self {
            method: method.clone(),
            ctx: Some(ctx),
        })
    }

    pub fn method(&self) -> &KeyExchangeMethod {
        &self.method
    }

    fn ctx_mut(&mut self) -> Result<&mut ProviderContext> {
        self.ctx.as_mut().ok_or_else(|| {
            Error::implementation(self.method.name(), ImplementationError::new("context released"))
        })
    }

    /// Set the peer's public key (raw encoding)
    pub fn set_peer(&mut self, peer: &[u8]) -> Result<()> {
        let method = self.method.clone();
        let Some(set_peer) = &method.0.set_peer else {
            return Err(Error::implementation(
                method.name(),
                ImplementationError::new("no peer key accepted"),
            ));
        };
        set_peer(self.ctx_mut()?, peer).map_err(|e| Error::implementation(method.name(), e))
    }

    /// Length of the shared secret
    pub fn secret_len(&mut self) -> Result<usize> {
        let method = self.method.clone();
        (method.0.derive)(self.ctx_mut()?, None).map_err(|e| Error::implementation(method.name(), e))
    }

    /// Derive the shared secret into `out`, returning the number of bytes written
    pub fn derive(&mut self, out: &mut [u8]) -> Result<usize> {
        let method = self.method.clone();
        (method.0.derive)(self.ctx_mut()?, Some(out))
            .map_err(|e| Error::implementation(method.name(), e))
    }

    /// Derive the shared secret into a buffer wiped on drop
    pub fn derive_to_vec(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut secret = Zeroizing::new(vec![0; self.secret_len()?]);
        let written = self.derive(&mut secret)?;
        secret.truncate(written);
        Ok(secret)
    }

    pub fn set_params(&mut self, params: &Params) -> Result<()> {
        let method = self.method.clone();
        let Some(set_params) = &method.0.set_params else {
            return Err(Error::implementation(
                method.name(),
                ImplementationError::new("no parameters accepted"),
            ));
        };
        set_params(self.ctx_mut()?, params).map_err(|e| Error::implementation(method.name(), e))
    }

    /// Duplicate the context, including the bound keys
    pub fn try_clone(&self) -> Result<Self> {
        let dupctx = self.method.0.dupctx.as_ref().ok_or_else(|| {
            Error::implementation(
                self.method.name(),
                ImplementationError::new("implementation cannot duplicate its context"),
            )
        })?;
        let ctx = self
            .ctx
            .as_ref()
            .and_then(|ctx| dupctx(ctx))
            .ok_or_else(|| {
                Error::implementation(
                    self.method.name(),
                    ImplementationError::new("context duplication failed"),
                )
            })?;
        Ok(Self {
            method: self.method.clone(),
            ctx: Some(ctx),
        })
    }
}

impl Drop for KeyExchangeContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            (self.method.0.freectx)(ctx);
        }
    }
}
