//! Function tables providers hand to the core for each algorithm
//!
//! A provider describes an algorithm implementation as a list of functions.
//! The core never calls into a table directly: an operation-specific adapter
//! validates the list once and turns it into a method object.

use crate::digest::DigestFlags;
use crate::error::implementation::ImplResult;
use crate::params::Params;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque per-operation state created by a provider and owned by one context
pub type ProviderContext = Box<dyn Any + Send>;

/// Create a fresh provider context
pub type NewCtxFn = Arc<dyn Fn() -> Option<ProviderContext> + Send + Sync>;
/// Release a provider context
pub type FreeCtxFn = Arc<dyn Fn(ProviderContext) + Send + Sync>;
/// Deep-copy a provider context
pub type DupCtxFn = Arc<dyn Fn(&ProviderContext) -> Option<ProviderContext> + Send + Sync>;
/// Apply parameters to a provider context
pub type SetCtxParamsFn = Arc<dyn Fn(&mut ProviderContext, &Params) -> ImplResult<()> + Send + Sync>;
/// Read parameters from a provider context
pub type GetCtxParamsFn = Arc<dyn Fn(&ProviderContext, &mut Params) -> ImplResult<()> + Send + Sync>;

/// Reset a digest context to the start of a message
pub type DigestInitFn = Arc<dyn Fn(&mut ProviderContext) -> ImplResult<()> + Send + Sync>;
/// Absorb message bytes
pub type DigestUpdateFn = Arc<dyn Fn(&mut ProviderContext, &[u8]) -> ImplResult<()> + Send + Sync>;
/// Write the digest into the buffer and return the number of bytes written
pub type DigestFinalFn = Arc<dyn Fn(&mut ProviderContext, &mut [u8]) -> ImplResult<usize> + Send + Sync>;
/// Digest a whole message without a context
pub type DigestOneShotFn = Arc<dyn Fn(&[u8], &mut [u8]) -> ImplResult<usize> + Send + Sync>;
/// Report a fixed size in bytes
pub type SizeFn = Arc<dyn Fn() -> usize + Send + Sync>;
/// Report digest capability flags
pub type DigestFlagsFn = Arc<dyn Fn() -> DigestFlags + Send + Sync>;

/// One entry of a digest dispatch table
#[derive(Clone)]
pub enum DigestFunction {
    NewCtx(NewCtxFn),
    Init(DigestInitFn),
    Update(DigestUpdateFn),
    Final(DigestFinalFn),
    Digest(DigestOneShotFn),
    FreeCtx(FreeCtxFn),
    DupCtx(DupCtxFn),
    Size(SizeFn),
    BlockSize(SizeFn),
    SetParams(SetCtxParamsFn),
    GetParams(GetCtxParamsFn),
    Flags(DigestFlagsFn),
}

impl DigestFunction {
    /// Stable numeric function id
    pub fn id(&self) -> u32 {
        match self {
            Self::NewCtx(_) => 1,
            Self::Init(_) => 2,
            Self::Update(_) => 3,
            Self::Final(_) => 4,
            Self::Digest(_) => 5,
            Self::FreeCtx(_) => 6,
            Self::DupCtx(_) => 7,
            Self::Size(_) => 8,
            Self::BlockSize(_) => 9,
            Self::SetParams(_) => 10,
            Self::GetParams(_) => 11,
            Self::Flags(_) => 12,
        }
    }

    pub fn new_ctx(f: impl Fn() -> Option<ProviderContext> + Send + Sync + 'static) -> Self {
        Self::NewCtx(Arc::new(f))
    }

    pub fn init(f: impl Fn(&mut ProviderContext) -> ImplResult<()> + Send + Sync + 'static) -> Self {
        Self::Init(Arc::new(f))
    }

    pub fn update(
        f: impl Fn(&mut ProviderContext, &[u8]) -> ImplResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::Update(Arc::new(f))
    }

    pub fn finalize(
        f: impl Fn(&mut ProviderContext, &mut [u8]) -> ImplResult<usize> + Send + Sync + 'static,
    ) -> Self {
        Self::Final(Arc::new(f))
    }

    pub fn digest(
        f: impl Fn(&[u8], &mut [u8]) -> ImplResult<usize> + Send + Sync + 'static,
    ) -> Self {
        Self::Digest(Arc::new(f))
    }

    pub fn free_ctx(f: impl Fn(ProviderContext) + Send + Sync + 'static) -> Self {
        Self::FreeCtx(Arc::new(f))
    }

    pub fn dup_ctx(
        f: impl Fn(&ProviderContext) -> Option<ProviderContext> + Send + Sync + 'static,
    ) -> Self {
        Self::DupCtx(Arc::new(f))
    }

    /// Constant output size
    pub fn size(size: usize) -> Self {
        Self::Size(Arc::new(move || size))
    }

    /// Constant block size
    pub fn block_size(size: usize) -> Self {
        Self::BlockSize(Arc::new(move || size))
    }

    pub fn set_params(
        f: impl Fn(&mut ProviderContext, &Params) -> ImplResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::SetParams(Arc::new(f))
    }

    pub fn get_params(
        f: impl Fn(&ProviderContext, &mut Params) -> ImplResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::GetParams(Arc::new(f))
    }

    /// Constant capability flags
    pub fn flags(flags: DigestFlags) -> Self {
        Self::Flags(Arc::new(move || flags))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::NewCtx(_) => "newctx",
            Self::Init(_) => "init",
            Self::Update(_) => "update",
            Self::Final(_) => "final",
            Self::Digest(_) => "digest",
            Self::FreeCtx(_) => "freectx",
            Self::DupCtx(_) => "dupctx",
            Self::Size(_) => "size",
            Self::BlockSize(_) => "block_size",
            Self::SetParams(_) => "set_params",
            Self::GetParams(_) => "get_params",
            Self::Flags(_) => "flags",
        }
    }
}

impl fmt::Debug for DigestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestFunction::{}({})", self.label(), self.id())
    }
}

/// Bind the key (raw encoding) used for a key exchange
pub type KeyExchangeInitFn = Arc<dyn Fn(&mut ProviderContext, &[u8]) -> ImplResult<()> + Send + Sync>;
/// Set the peer's public key (raw encoding)
pub type KeyExchangeSetPeerFn =
    Arc<dyn Fn(&mut ProviderContext, &[u8]) -> ImplResult<()> + Send + Sync>;
/// Derive the shared secret; `None` asks for the secret length only
pub type KeyExchangeDeriveFn =
    Arc<dyn Fn(&mut ProviderContext, Option<&mut [u8]>) -> ImplResult<usize> + Send + Sync>;

/// One entry of a key-exchange dispatch table
#[derive(Clone)]
pub enum KeyExchangeFunction {
    NewCtx(NewCtxFn),
    Init(KeyExchangeInitFn),
    SetPeer(KeyExchangeSetPeerFn),
    Derive(KeyExchangeDeriveFn),
    FreeCtx(FreeCtxFn),
    DupCtx(DupCtxFn),
    SetParams(SetCtxParamsFn),
}

impl KeyExchangeFunction {
    /// Stable numeric function id
    pub fn id(&self) -> u32 {
        match self {
            Self::NewCtx(_) => 1,
            Self::Init(_) => 2,
            Self::Derive(_) => 3,
            Self::SetPeer(_) => 4,
            Self::FreeCtx(_) => 5,
            Self::DupCtx(_) => 6,
            Self::SetParams(_) => 7,
        }
    }

    pub fn new_ctx(f: impl Fn() -> Option<ProviderContext> + Send + Sync + 'static) -> Self {
        Self::NewCtx(Arc::new(f))
    }

    pub fn init(
        f: impl Fn(&mut ProviderContext, &[u8]) -> ImplResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::Init(Arc::new(f))
    }

    pub fn set_peer(
        f: impl Fn(&mut ProviderContext, &[u8]) -> ImplResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::SetPeer(Arc::new(f))
    }

    pub fn derive(
        f: impl Fn(&mut ProviderContext, Option<&mut [u8]>) -> ImplResult<usize>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::Derive(Arc::new(f))
    }

    pub fn free_ctx(f: impl Fn(ProviderContext) + Send + Sync + 'static) -> Self {
        Self::FreeCtx(Arc::new(f))
    }

    pub fn dup_ctx(
        f: impl Fn(&ProviderContext) -> Option<ProviderContext> + Send + Sync + 'static,
    ) -> Self {
        Self::DupCtx(Arc::new(f))
    }

    pub fn set_params(
        f: impl Fn(&mut ProviderContext, &Params) -> ImplResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self::SetParams(Arc::new(f))
    }
}

impl fmt::Debug for KeyExchangeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyExchangeFunction({})", self.id())
    }
}

/// Downcast a provider context to the implementation's state type
pub fn state_mut<'a, T: 'static>(
    ctx: &'a mut ProviderContext,
    expected: &str,
) -> ImplResult<&'a mut T> {
    ctx.downcast_mut::<T>()
        .ok_or_else(|| crate::error::ImplementationError::context_mismatch(expected))
}

/// Shared-reference variant of [`state_mut`]
pub fn state_ref<'a, T: 'static>(ctx: &'a ProviderContext, expected: &str) -> ImplResult<&'a T> {
    ctx.downcast_ref::<T>()
        .ok_or_else(|| crate::error::ImplementationError::context_mismatch(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_ids_are_distinct() {
        let functions = [
            DigestFunction::size(32),
            DigestFunction::block_size(64),
            DigestFunction::free_ctx(drop),
        ];
        let ids: Vec<u32> = functions.iter().map(DigestFunction::id).collect();
        assert_eq!(ids, vec![8, 9, 6]);
        assert_eq!(format!("{:?}", functions[0]), "DigestFunction::size(8)");
    }

    #[test]
    fn test_state_downcast() {
        let mut ctx: ProviderContext = Box::new(7u64);
        *state_mut::<u64>(&mut ctx, "counter").unwrap() += 1;
        assert_eq!(*state_ref::<u64>(&ctx, "counter").unwrap(), 8);
        assert!(state_ref::<u32>(&ctx, "counter").is_err());
    }
}
