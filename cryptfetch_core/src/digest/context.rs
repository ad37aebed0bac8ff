//! Streaming digest context
//!
//! ```text
//!            init            update           final
//!   Empty ---------> Bound ---------> Active ---------> Finalized
//!     ^                ^                 |                  |
//!     |                +---- init -------+---- init --------+
//!     +------------------------- reset ----------------------+
//! ```
//!
//! A context exclusively owns its provider context (provided methods) or its
//! scratch buffer (legacy methods). Secret state is wiped on final, reset and
//! drop.

use super::legacy::LegacyCtrl;
use super::method::{DigestMethod, ProvidedDigest};
use crate::dispatch::ProviderContext;
use crate::error::{DigestError, Result};
use crate::method::FetchableMethod;
use crate::params::{DIGEST_PARAM_XOFLEN, ParamValue, Params};
use log::trace;
use zeroize::{Zeroize, Zeroizing};

/// Life-cycle state of a [`DigestContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No method bound
    Empty,
    /// Bound and initialized, no data absorbed yet
    Bound,
    /// At least one non-empty update absorbed
    Active,
    /// Digest produced; re-initialize before further use
    Finalized,
}

/// Behaviour flags of a [`DigestContext`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ContextFlags(u32);

impl ContextFlags {
    /// The context digests a single message only
    pub const ONESHOT: Self = Self(0x0001);
    /// Legacy cleanup already ran for the current state
    pub const CLEANED: Self = Self(0x0002);
    /// The scratch buffer was reused by the last copy
    pub const REUSE: Self = Self(0x0004);
    /// Skip the method's init callback on init
    pub const NO_INIT: Self = Self(0x0100);
    /// Keep the parent key context on reset; never inherited by copies
    pub const KEEP_PARENT_CTX: Self = Self(0x0400);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for ContextFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

enum ContextData {
    None,
    Provided(ProviderContext),
    Legacy(Zeroizing<Vec<u8>>),
}

/// Streaming digest computation over any [`DigestMethod`]
pub struct DigestContext {
    method: Option<DigestMethod>,
    data: ContextData,
    state: ContextState,
    flags: ContextFlags,
}

impl Default for DigestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DigestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestContext")
            .field("method", &self.method)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .finish()
    }
}

impl DigestContext {
    /// Create an empty, unbound context
    pub fn new() -> Self {
        Self {
            method: None,
            data: ContextData::None,
            state: ContextState::Empty,
            flags: ContextFlags::empty(),
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Bound method, if any
    pub fn method(&self) -> Option<&DigestMethod> {
        self.method.as_ref()
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ContextFlags) {
        self.flags.insert(flags);
    }

    pub fn clear_flags(&mut self, flags: ContextFlags) {
        self.flags.remove(flags);
    }

    /// Output size of the bound method
    pub fn size(&self) -> Option<usize> {
        self.method.as_ref().map(DigestMethod::size)
    }

    /// Block size of the bound method
    pub fn block_size(&self) -> Option<usize> {
        self.method.as_ref().map(DigestMethod::block_size)
    }

    /// Bind a method and start a new message.
    ///
    /// Binding a different method releases everything held for the previous
    /// one. Any partial message is discarded. On failure the context is reset.
    pub fn init(&mut self, method: &DigestMethod) -> Result<()> {
        let same = self
            .method
            .as_ref()
            .is_some_and(|bound| bound.same_method(method));
        if !same {
            self.release_data();
            self.method = Some(method.clone());
        }
        self.rearm()
    }

    /// Start a new message with the method already bound
    pub fn reinit(&mut self) -> Result<()> {
        if self.method.is_none() {
            return Err(DigestError::NotInitialized.into());
        }
        self.rearm()
    }

    fn rearm(&mut self) -> Result<()> {
        self.flags.remove(ContextFlags::CLEANED);
        let result = self.arm();
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn arm(&mut self) -> Result<()> {
        let Some(method) = self.method.clone() else {
            return Err(DigestError::NotInitialized.into());
        };
        let skip_init = self.flags.contains(ContextFlags::NO_INIT);

        match &method {
            DigestMethod::Provided(provided) => {
                if let Some(streaming) = provided.streaming() {
                    if !matches!(self.data, ContextData::Provided(_)) {
                        self.release_data();
                        let ctx = (streaming.newctx)().ok_or_else(|| {
                            DigestError::initialization_failed(
                                provided.name(),
                                "provider returned no context",
                            )
                        })?;
                        self.data = ContextData::Provided(ctx);
                    }
                    if !skip_init {
                        if let ContextData::Provided(ctx) = &mut self.data {
                            (streaming.init)(ctx)
                                .map_err(|e| DigestError::implementation(provided.name(), e))?;
                        }
                    }
                } else {
                    self.release_data();
                }
            }
            DigestMethod::Legacy(legacy) => {
                if skip_init {
                    self.release_data();
                } else {
                    let reusable = matches!(
                        &self.data,
                        ContextData::Legacy(scratch) if scratch.len() == legacy.ctx_size
                    );
                    if !reusable {
                        self.release_data();
                        self.data = ContextData::Legacy(Zeroizing::new(vec![0; legacy.ctx_size]));
                    }
                    if let ContextData::Legacy(scratch) = &mut self.data {
                        scratch.as_mut_slice().zeroize();
                        (legacy.init)(scratch.as_mut_slice())
                            .map_err(|e| DigestError::implementation(legacy.name, e))?;
                    }
                }
            }
        }

        trace!("Digest context bound to {}", method.name());
        self.state = ContextState::Bound;
        Ok(())
    }

    /// Absorb message bytes. Empty input is a no-op.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        let Some(method) = &self.method else {
            return Err(DigestError::NotInitialized.into());
        };
        if self.state == ContextState::Finalized {
            return Err(DigestError::NoDigestState.into());
        }
        if data.is_empty() {
            return Ok(());
        }

        match method {
            DigestMethod::Provided(provided) => {
                let streaming = provided
                    .streaming()
                    .ok_or_else(|| DigestError::update_unsupported(provided.name()))?;
                let ContextData::Provided(ctx) = &mut self.data else {
                    return Err(DigestError::NoDigestState.into());
                };
                (streaming.update)(ctx, data)
                    .map_err(|e| DigestError::implementation(provided.name(), e))?;
            }
            DigestMethod::Legacy(legacy) => {
                let mut none = [0u8; 0];
                let scratch: &mut [u8] = match &mut self.data {
                    ContextData::Legacy(scratch) => scratch.as_mut_slice(),
                    _ if legacy.ctx_size == 0 => &mut none,
                    _ => return Err(DigestError::NoDigestState.into()),
                };
                (legacy.update)(scratch, data)
                    .map_err(|e| DigestError::implementation(legacy.name, e))?;
            }
        }
        self.state = ContextState::Active;
        Ok(())
    }

    /// Produce the digest into `out` and return the number of bytes written.
    ///
    /// Exactly the method's declared size is written, or for an extendable
    /// output the length currently set through `xoflen`. The context is wiped
    /// and must be re-initialized before further use.
    pub fn finalize(&mut self, out: &mut [u8]) -> Result<usize> {
        let Some(size) = self.output_len() else {
            return Err(DigestError::NotInitialized.into());
        };
        self.finalize_with(out, size, None)
    }

    /// Bytes the next [`finalize`](Self::finalize) will write
    fn output_len(&self) -> Option<usize> {
        let method = self.method.as_ref()?;
        let readable = match method {
            DigestMethod::Provided(provided) => method.is_xof() && provided.get_params().is_some(),
            DigestMethod::Legacy(_) => false,
        };
        if !readable {
            return Some(method.size());
        }
        let mut params = Params::new();
        let current = match self.get_params(&mut params) {
            Ok(()) => params.get_size(DIGEST_PARAM_XOFLEN),
            Err(_) => None,
        };
        Some(current.filter(|len| *len > 0).unwrap_or_else(|| method.size()))
    }

    /// Produce `size` bytes of extendable output into `out`
    pub fn final_extendable(&mut self, out: &mut [u8], size: usize) -> Result<usize> {
        let Some(method) = &self.method else {
            return Err(DigestError::NotInitialized.into());
        };
        if !method.is_xof() || size == 0 || size > out.len() {
            return Err(DigestError::not_extendable(method.name(), size).into());
        }
        self.finalize_with(out, size, Some(size))
    }

    /// Produce the digest into a freshly allocated vector
    pub fn finalize_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = vec![0; self.output_len().unwrap_or(0)];
        let written = self.finalize(&mut out)?;
        out.truncate(written);
        Ok(out)
    }

    fn finalize_with(&mut self, out: &mut [u8], size: usize, xof_len: Option<usize>) -> Result<usize> {
        let Some(method) = self.method.clone() else {
            return Err(DigestError::NotInitialized.into());
        };
        if self.state == ContextState::Finalized {
            return Err(DigestError::NoDigestState.into());
        }
        if out.len() < size {
            return Err(DigestError::buffer_too_small(size, out.len()).into());
        }
        let out = &mut out[..size];

        let result = match &method {
            DigestMethod::Provided(provided) => self.finalize_provided(provided, out, xof_len),
            DigestMethod::Legacy(legacy) => {
                let mut none = [0u8; 0];
                let scratch: &mut [u8] = match &mut self.data {
                    ContextData::Legacy(scratch) => scratch.as_mut_slice(),
                    _ if legacy.ctx_size == 0 => &mut none,
                    _ => return Err(DigestError::NoDigestState.into()),
                };
                if let Some(len) = xof_len {
                    let ctrl = legacy
                        .ctrl
                        .ok_or_else(|| DigestError::not_extendable(legacy.name, len))?;
                    ctrl(scratch, LegacyCtrl::XofLen(len))
                        .map_err(|_| DigestError::not_extendable(legacy.name, len))?;
                }
                (legacy.finish)(scratch, out)
                    .map(|()| size)
                    .map_err(|e| DigestError::implementation(legacy.name, e))
            }
        };
        // A rejected output length leaves the message intact
        if let Err(error @ DigestError::NotExtendableOrInvalidLength { .. }) = result {
            return Err(error.into());
        }

        self.wipe_after_final();
        self.state = ContextState::Finalized;
        Ok(result?)
    }

    fn finalize_provided(
        &mut self,
        provided: &ProvidedDigest,
        out: &mut [u8],
        xof_len: Option<usize>,
    ) -> std::result::Result<usize, DigestError> {
        let streaming = provided
            .streaming()
            .ok_or_else(|| DigestError::final_unsupported(provided.name()))?;
        let ContextData::Provided(ctx) = &mut self.data else {
            return Err(DigestError::NoDigestState);
        };
        if let Some(len) = xof_len {
            let set_params = provided
                .set_params()
                .ok_or_else(|| DigestError::not_extendable(provided.name(), len))?;
            let params = Params::new().with(DIGEST_PARAM_XOFLEN, ParamValue::Size(len));
            set_params(ctx, &params).map_err(|_| DigestError::not_extendable(provided.name(), len))?;
        }
        let written = (streaming.final_)(ctx, out)
            .map_err(|e| DigestError::implementation(provided.name(), e))?;
        if written != out.len() {
            return Err(DigestError::implementation(
                provided.name(),
                crate::error::ImplementationError::new(format!(
                    "wrote {written} bytes instead of {}",
                    out.len()
                )),
            ));
        }
        Ok(written)
    }

    fn wipe_after_final(&mut self) {
        match &self.method {
            Some(DigestMethod::Legacy(legacy)) => {
                if let ContextData::Legacy(scratch) = &mut self.data {
                    if let Some(cleanup) = legacy.cleanup {
                        cleanup(scratch.as_mut_slice());
                    }
                    scratch.as_mut_slice().zeroize();
                }
                self.flags.insert(ContextFlags::CLEANED);
            }
            _ => self.release_data(),
        }
    }

    /// Make this context an independent copy of `src`.
    ///
    /// On failure this context is left reset.
    pub fn copy_from(&mut self, src: &DigestContext) -> Result<()> {
        let Some(method) = src.method.clone() else {
            self.reset();
            return Err(DigestError::InputNotInitialized.into());
        };

        let mut reused = false;
        let data = match (&method, &src.data) {
            (DigestMethod::Provided(provided), ContextData::Provided(ctx)) => {
                let Some(dupctx) = provided.dupctx() else {
                    self.reset();
                    return Err(DigestError::not_able_to_copy(
                        provided.name(),
                        "implementation cannot duplicate its context",
                    )
                    .into());
                };
                let Some(copy) = dupctx(ctx) else {
                    self.reset();
                    return Err(DigestError::not_able_to_copy(
                        provided.name(),
                        "context duplication failed",
                    )
                    .into());
                };
                self.reset();
                ContextData::Provided(copy)
            }
            (DigestMethod::Legacy(legacy), ContextData::Legacy(source)) => {
                let reusable = match (&self.method, &mut self.data) {
                    (Some(bound), ContextData::Legacy(scratch))
                        if bound.same_method(&method) && scratch.len() == source.len() =>
                    {
                        Some(std::mem::replace(scratch, Zeroizing::new(Vec::new())))
                    }
                    _ => None,
                };
                reused = reusable.is_some();
                self.reset();
                let mut scratch =
                    reusable.unwrap_or_else(|| Zeroizing::new(vec![0; source.len()]));
                scratch.copy_from_slice(source.as_slice());
                if let Some(copy) = legacy.copy {
                    if let Err(e) = copy(scratch.as_mut_slice(), source.as_slice()) {
                        return Err(DigestError::not_able_to_copy(legacy.name, e.message()).into());
                    }
                }
                ContextData::Legacy(scratch)
            }
            _ => {
                self.reset();
                ContextData::None
            }
        };

        self.method = Some(method);
        self.data = data;
        self.state = src.state;
        self.flags = src.flags;
        self.flags.remove(ContextFlags::KEEP_PARENT_CTX | ContextFlags::REUSE);
        if reused {
            self.flags.insert(ContextFlags::REUSE);
        }
        Ok(())
    }

    /// Create an independent copy of this context
    pub fn try_clone(&self) -> Result<Self> {
        let mut copy = Self::new();
        copy.copy_from(self)?;
        Ok(copy)
    }

    /// Forward parameters to the method's implementation
    pub fn set_params(&mut self, params: &Params) -> Result<()> {
        let Some(method) = &self.method else {
            return Err(DigestError::NotInitialized.into());
        };
        match method {
            DigestMethod::Provided(provided) => {
                let set_params = provided
                    .set_params()
                    .ok_or_else(|| DigestError::params_unsupported(provided.name()))?;
                let ContextData::Provided(ctx) = &mut self.data else {
                    return Err(DigestError::NoDigestState.into());
                };
                set_params(ctx, params).map_err(|e| DigestError::implementation(provided.name(), e))?;
            }
            DigestMethod::Legacy(legacy) => {
                let (Some(ctrl), Some(len)) = (legacy.ctrl, params.get_size(DIGEST_PARAM_XOFLEN))
                else {
                    return Err(DigestError::params_unsupported(legacy.name).into());
                };
                let ContextData::Legacy(scratch) = &mut self.data else {
                    return Err(DigestError::NoDigestState.into());
                };
                ctrl(scratch.as_mut_slice(), LegacyCtrl::XofLen(len))
                    .map_err(|e| DigestError::implementation(legacy.name, e))?;
            }
        }
        Ok(())
    }

    /// Read parameters from the method's implementation
    pub fn get_params(&self, params: &mut Params) -> Result<()> {
        let Some(method) = &self.method else {
            return Err(DigestError::NotInitialized.into());
        };
        let DigestMethod::Provided(provided) = method else {
            return Err(DigestError::params_unsupported(method.name()).into());
        };
        let get_params = provided
            .get_params()
            .ok_or_else(|| DigestError::params_unsupported(provided.name()))?;
        let ContextData::Provided(ctx) = &self.data else {
            return Err(DigestError::NoDigestState.into());
        };
        get_params(ctx, params).map_err(|e| DigestError::implementation(provided.name(), e))?;
        Ok(())
    }

    /// Release everything and return to [`ContextState::Empty`]. Idempotent.
    pub fn reset(&mut self) {
        self.release_data();
        self.method = None;
        self.state = ContextState::Empty;
        self.flags = ContextFlags::empty();
    }

    fn release_data(&mut self) {
        match std::mem::replace(&mut self.data, ContextData::None) {
            ContextData::None => {}
            ContextData::Provided(ctx) => match &self.method {
                Some(DigestMethod::Provided(provided)) => match provided.streaming() {
                    Some(streaming) => (streaming.freectx)(ctx),
                    None => drop(ctx),
                },
                _ => drop(ctx),
            },
            ContextData::Legacy(mut scratch) => {
                if let Some(DigestMethod::Legacy(legacy)) = &self.method {
                    if !self.flags.contains(ContextFlags::CLEANED) {
                        if let Some(cleanup) = legacy.cleanup {
                            cleanup(scratch.as_mut_slice());
                        }
                    }
                }
                scratch.zeroize();
            }
        }
    }
}

impl Drop for DigestContext {
    fn drop(&mut self) {
        self.release_data();
    }
}

/// Digest a complete message in one call.
///
/// Uses the method's one-shot function when it has one, otherwise a private
/// context flagged [`ContextFlags::ONESHOT`].
pub fn digest_oneshot(method: &DigestMethod, data: &[u8]) -> Result<Vec<u8>> {
    if let DigestMethod::Provided(provided) = method {
        if let Some(digest) = provided.oneshot() {
            let mut out = vec![0; method.size()];
            let written =
                digest(data, &mut out).map_err(|e| DigestError::implementation(provided.name(), e))?;
            out.truncate(written);
            return Ok(out);
        }
    }

    let mut ctx = DigestContext::new();
    ctx.set_flags(ContextFlags::ONESHOT);
    ctx.init(method)?;
    ctx.update(data)?;
    ctx.finalize_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::legacy::{CRC32, NULL_DIGEST};
    use crate::dispatch::{DigestFunction, state_mut, state_ref};
    use crate::method::OperationId;
    use crate::provider::{Algorithm, Implementation, Provider, ProviderHandle};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unused;

    impl Provider for Unused {
        fn name(&self) -> &str {
            "unit"
        }

        fn query_operation(&self, _operation: OperationId) -> Option<&[Algorithm]> {
            None
        }
    }

    /// Byte-sum digest with a one-byte output; counts freed contexts
    fn byte_sum(freed: Arc<AtomicUsize>, with_dup: bool) -> DigestMethod {
        let mut functions = vec![
            DigestFunction::new_ctx(|| Some(Box::new(0u8) as ProviderContext)),
            DigestFunction::init(|ctx| {
                *state_mut::<u8>(ctx, "byte sum")? = 0;
                Ok(())
            }),
            DigestFunction::update(|ctx, data| {
                let sum = state_mut::<u8>(ctx, "byte sum")?;
                *sum = data.iter().fold(*sum, |acc, b| acc.wrapping_add(*b));
                Ok(())
            }),
            DigestFunction::finalize(|ctx, out| {
                out[0] = *state_mut::<u8>(ctx, "byte sum")?;
                Ok(1)
            }),
            DigestFunction::free_ctx(move |_ctx| {
                freed.fetch_add(1, Ordering::SeqCst);
            }),
            DigestFunction::size(1),
        ];
        if with_dup {
            functions.push(DigestFunction::dup_ctx(|ctx| {
                let sum = *state_ref::<u8>(ctx, "byte sum").ok()?;
                Some(Box::new(sum) as ProviderContext)
            }));
        }
        let provider = ProviderHandle::new(Unused);
        DigestMethod::from_dispatch("BYTESUM", &Implementation::Digest(functions), &provider)
            .unwrap()
    }

    fn crc32() -> DigestMethod {
        DigestMethod::Legacy(&CRC32)
    }

    #[test]
    fn test_update_before_init_fails() {
        let mut ctx = DigestContext::new();
        assert!(matches!(
            ctx.update(b"abc"),
            Err(crate::Error::Digest(DigestError::NotInitialized))
        ));
        assert!(matches!(
            ctx.finalize(&mut [0u8; 4]),
            Err(crate::Error::Digest(DigestError::NotInitialized))
        ));
    }

    #[test]
    fn test_state_transitions() {
        let mut ctx = DigestContext::new();
        assert_eq!(ctx.state(), ContextState::Empty);
        ctx.init(&crc32()).unwrap();
        assert_eq!(ctx.state(), ContextState::Bound);
        ctx.update(b"").unwrap();
        assert_eq!(ctx.state(), ContextState::Bound);
        ctx.update(b"123456789").unwrap();
        assert_eq!(ctx.state(), ContextState::Active);
        assert_eq!(ctx.finalize_to_vec().unwrap(), vec![0xCB, 0xF4, 0x39, 0x26]);
        assert_eq!(ctx.state(), ContextState::Finalized);
        assert!(ctx.flags().contains(ContextFlags::CLEANED));
        ctx.reset();
        assert_eq!(ctx.state(), ContextState::Empty);
        assert!(ctx.method().is_none());
        ctx.reset();
    }

    #[test]
    fn test_double_final_fails() {
        let mut ctx = DigestContext::new();
        ctx.init(&crc32()).unwrap();
        let mut out = [0u8; 4];
        assert_eq!(ctx.finalize(&mut out).unwrap(), 4);
        assert!(matches!(
            ctx.finalize(&mut out),
            Err(crate::Error::Digest(DigestError::NoDigestState))
        ));
        assert!(matches!(
            ctx.update(b"more"),
            Err(crate::Error::Digest(DigestError::NoDigestState))
        ));
        ctx.reinit().unwrap();
        assert_eq!(ctx.finalize(&mut out).unwrap(), 4);
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn test_short_buffer_keeps_state() {
        let mut ctx = DigestContext::new();
        ctx.init(&crc32()).unwrap();
        ctx.update(b"123456789").unwrap();
        assert!(matches!(
            ctx.finalize(&mut [0u8; 2]),
            Err(crate::Error::Digest(DigestError::BufferTooSmall { required: 4, provided: 2 }))
        ));
        assert_eq!(ctx.state(), ContextState::Active);
        let mut out = [0u8; 8];
        assert_eq!(ctx.finalize(&mut out).unwrap(), 4);
        assert_eq!(&out[..4], &[0xCB, 0xF4, 0x39, 0x26]);
    }

    #[test]
    fn test_reinit_discards_partial_message() {
        let mut ctx = DigestContext::new();
        ctx.init(&crc32()).unwrap();
        ctx.update(b"garbage").unwrap();
        ctx.init(&crc32()).unwrap();
        ctx.update(b"123456789").unwrap();
        assert_eq!(ctx.finalize_to_vec().unwrap(), vec![0xCB, 0xF4, 0x39, 0x26]);
    }

    #[test]
    fn test_null_digest_has_empty_output() {
        let mut ctx = DigestContext::new();
        ctx.init(&DigestMethod::Legacy(&NULL_DIGEST)).unwrap();
        ctx.update(b"ignored").unwrap();
        assert_eq!(ctx.finalize_to_vec().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_fixed_size_digest_is_not_extendable() {
        let mut ctx = DigestContext::new();
        ctx.init(&crc32()).unwrap();
        let mut out = [0u8; 16];
        assert!(matches!(
            ctx.final_extendable(&mut out, 16),
            Err(crate::Error::Digest(DigestError::NotExtendableOrInvalidLength { .. }))
        ));
        assert_eq!(ctx.state(), ContextState::Bound);
    }

    #[test]
    fn test_legacy_copy_reuses_scratch() {
        let mut src = DigestContext::new();
        src.init(&crc32()).unwrap();
        src.update(b"12345").unwrap();

        let mut dst = DigestContext::new();
        dst.copy_from(&src).unwrap();
        assert!(!dst.flags().contains(ContextFlags::REUSE));
        dst.copy_from(&src).unwrap();
        assert!(dst.flags().contains(ContextFlags::REUSE));

        src.update(b"6789").unwrap();
        dst.update(b"6789").unwrap();
        assert_eq!(src.finalize_to_vec().unwrap(), dst.finalize_to_vec().unwrap());
    }

    #[test]
    fn test_copy_from_unbound_source_fails() {
        let src = DigestContext::new();
        let mut dst = DigestContext::new();
        dst.init(&crc32()).unwrap();
        assert!(matches!(
            dst.copy_from(&src),
            Err(crate::Error::Digest(DigestError::InputNotInitialized))
        ));
        assert_eq!(dst.state(), ContextState::Empty);
    }

    #[test]
    fn test_copy_clears_keep_parent_flag() {
        let mut src = DigestContext::new();
        src.set_flags(ContextFlags::KEEP_PARENT_CTX | ContextFlags::ONESHOT);
        src.init(&crc32()).unwrap();
        let dst = src.try_clone().unwrap();
        assert!(dst.flags().contains(ContextFlags::ONESHOT));
        assert!(!dst.flags().contains(ContextFlags::KEEP_PARENT_CTX));
    }

    #[test]
    fn test_provided_context_freed_once() {
        let freed = Arc::new(AtomicUsize::new(0));
        let method = byte_sum(Arc::clone(&freed), true);
        let mut ctx = DigestContext::new();
        ctx.init(&method).unwrap();
        ctx.update(&[1, 2, 3]).unwrap();
        assert_eq!(ctx.finalize_to_vec().unwrap(), vec![6]);
        assert_eq!(freed.load(Ordering::SeqCst), 1);

        ctx.init(&method).unwrap();
        ctx.reset();
        ctx.reset();
        assert_eq!(freed.load(Ordering::SeqCst), 2);

        ctx.init(&method).unwrap();
        drop(ctx);
        assert_eq!(freed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_switching_method_frees_previous_context() {
        let freed = Arc::new(AtomicUsize::new(0));
        let method = byte_sum(Arc::clone(&freed), false);
        let mut ctx = DigestContext::new();
        ctx.init(&method).unwrap();
        assert_eq!(method.ref_count(), Some(2));
        ctx.init(&crc32()).unwrap();
        assert_eq!(freed.load(Ordering::SeqCst), 1);
        assert_eq!(method.ref_count(), Some(1));
    }

    #[test]
    fn test_copy_without_dupctx_leaves_destination_empty() {
        let freed = Arc::new(AtomicUsize::new(0));
        let method = byte_sum(freed, false);
        let mut src = DigestContext::new();
        src.init(&method).unwrap();
        let mut dst = DigestContext::new();
        dst.init(&crc32()).unwrap();
        assert!(matches!(
            dst.copy_from(&src),
            Err(crate::Error::Digest(DigestError::NotAbleToCopy { .. }))
        ));
        assert_eq!(dst.state(), ContextState::Empty);
        assert!(dst.method().is_none());
    }

    #[test]
    fn test_provided_copy_is_independent() {
        let freed = Arc::new(AtomicUsize::new(0));
        let method = byte_sum(freed, true);
        let mut src = DigestContext::new();
        src.init(&method).unwrap();
        src.update(&[10]).unwrap();
        let mut dst = src.try_clone().unwrap();
        dst.update(&[5]).unwrap();
        assert_eq!(src.finalize_to_vec().unwrap(), vec![10]);
        assert_eq!(dst.finalize_to_vec().unwrap(), vec![15]);
    }

    #[test]
    fn test_params_unsupported() {
        let freed = Arc::new(AtomicUsize::new(0));
        let mut ctx = DigestContext::new();
        ctx.init(&byte_sum(freed, false)).unwrap();
        let params = Params::new().with(DIGEST_PARAM_XOFLEN, ParamValue::Size(4));
        assert!(matches!(
            ctx.set_params(&params),
            Err(crate::Error::Digest(DigestError::ParamsUnsupported { .. }))
        ));
        let mut legacy = DigestContext::new();
        legacy.init(&crc32()).unwrap();
        assert!(legacy.get_params(&mut Params::new()).is_err());
    }

    #[test]
    fn test_no_init_skips_scratch() {
        let mut ctx = DigestContext::new();
        ctx.set_flags(ContextFlags::NO_INIT);
        ctx.init(&crc32()).unwrap();
        assert!(matches!(
            ctx.update(b"abc"),
            Err(crate::Error::Digest(DigestError::NoDigestState))
        ));
    }

    #[test]
    fn test_oneshot_matches_streaming() {
        assert_eq!(
            digest_oneshot(&crc32(), b"123456789").unwrap(),
            vec![0xCB, 0xF4, 0x39, 0x26]
        );
    }

    proptest! {
        #[test]
        fn test_split_updates_match_oneshot(data in proptest::collection::vec(any::<u8>(), 0..512), split in 0usize..512) {
            let split = split.min(data.len());
            let mut ctx = DigestContext::new();
            ctx.init(&crc32()).unwrap();
            ctx.update(&data[..split]).unwrap();
            ctx.update(&[]).unwrap();
            ctx.update(&data[split..]).unwrap();
            prop_assert_eq!(ctx.finalize_to_vec().unwrap(), digest_oneshot(&crc32(), &data).unwrap());
        }
    }
}
