//! Digest method objects and the digest dispatch adapter

use super::legacy::LegacyDigest;
use crate::dispatch::{
    DigestFinalFn, DigestFunction, DigestInitFn, DigestOneShotFn, DigestUpdateFn, DupCtxFn,
    FreeCtxFn, GetCtxParamsFn, NewCtxFn, SetCtxParamsFn, SizeFn,
};
use crate::method::{ConstructionError, FetchableMethod, OperationId};
use crate::provider::{Implementation, MethodBinding, ProviderHandle};
use std::fmt;
use std::sync::Arc;

/// Capability flags of a digest algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DigestFlags(u32);

impl DigestFlags {
    /// Extendable output: any requested length may be produced
    pub const XOF: Self = Self(0x0001);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for DigestFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The complete streaming function set
#[derive(Clone)]
pub(crate) struct StreamingFunctions {
    pub(crate) newctx: NewCtxFn,
    pub(crate) init: DigestInitFn,
    pub(crate) update: DigestUpdateFn,
    pub(crate) final_: DigestFinalFn,
    pub(crate) freectx: FreeCtxFn,
}

pub(crate) struct ProvidedDigestInner {
    name: String,
    streaming: Option<StreamingFunctions>,
    digest: Option<DigestOneShotFn>,
    dupctx: Option<DupCtxFn>,
    size: SizeFn,
    block_size: Option<SizeFn>,
    set_params: Option<SetCtxParamsFn>,
    get_params: Option<GetCtxParamsFn>,
    flags: DigestFlags,
    binding: MethodBinding,
}

/// Digest implementation supplied by a provider
#[derive(Clone)]
pub struct ProvidedDigest(Arc<ProvidedDigestInner>);

#[derive(Default)]
struct DigestTable {
    newctx: Option<NewCtxFn>,
    init: Option<DigestInitFn>,
    update: Option<DigestUpdateFn>,
    final_: Option<DigestFinalFn>,
    freectx: Option<FreeCtxFn>,
    digest: Option<DigestOneShotFn>,
    dupctx: Option<DupCtxFn>,
    size: Option<SizeFn>,
    block_size: Option<SizeFn>,
    set_params: Option<SetCtxParamsFn>,
    get_params: Option<GetCtxParamsFn>,
    flags: Option<crate::dispatch::DigestFlagsFn>,
}

fn first<T: Clone>(slot: &mut Option<T>, function: &T) {
    if slot.is_none() {
        *slot = Some(function.clone());
    }
}

impl DigestTable {
    fn collect(functions: &[DigestFunction]) -> Self {
        let mut table = Self::default();
        for function in functions {
            match function {
                DigestFunction::NewCtx(f) => first(&mut table.newctx, f),
                DigestFunction::Init(f) => first(&mut table.init, f),
                DigestFunction::Update(f) => first(&mut table.update, f),
                DigestFunction::Final(f) => first(&mut table.final_, f),
                DigestFunction::FreeCtx(f) => first(&mut table.freectx, f),
                DigestFunction::Digest(f) => first(&mut table.digest, f),
                DigestFunction::DupCtx(f) => first(&mut table.dupctx, f),
                DigestFunction::Size(f) => first(&mut table.size, f),
                DigestFunction::BlockSize(f) => first(&mut table.block_size, f),
                DigestFunction::SetParams(f) => first(&mut table.set_params, f),
                DigestFunction::GetParams(f) => first(&mut table.get_params, f),
                DigestFunction::Flags(f) => first(&mut table.flags, f),
            }
        }
        table
    }

    fn streaming_count(&self) -> usize {
        [
            self.newctx.is_some(),
            self.init.is_some(),
            self.update.is_some(),
            self.final_.is_some(),
            self.freectx.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

impl ProvidedDigest {
    /// Validate a digest dispatch table and build a method from it
    pub fn from_functions(
        name: &str,
        functions: &[DigestFunction],
        provider: &ProviderHandle,
    ) -> Result<Self, ConstructionError> {
        let table = DigestTable::collect(functions);

        let streaming = match table.streaming_count() {
            0 => None,
            5 => Some(StreamingFunctions {
                newctx: table.newctx.clone().ok_or_else(missing("newctx"))?,
                init: table.init.clone().ok_or_else(missing("init"))?,
                update: table.update.clone().ok_or_else(missing("update"))?,
                final_: table.final_.clone().ok_or_else(missing("final"))?,
                freectx: table.freectx.clone().ok_or_else(missing("freectx"))?,
            }),
            _ => {
                return Err(ConstructionError::IncompleteDispatch(
                    "streaming digests need newctx, init, update, final and freectx".to_string(),
                ));
            }
        };
        if streaming.is_none() && table.digest.is_none() {
            return Err(ConstructionError::IncompleteDispatch(
                "neither streaming functions nor a one-shot digest".to_string(),
            ));
        }
        let size = table.size.ok_or_else(missing("size"))?;
        let flags = table.flags.map(|flags| flags()).unwrap_or_default();

        Ok(Self(Arc::new(ProvidedDigestInner {
            name: name.to_string(),
            streaming,
            digest: table.digest,
            dupctx: table.dupctx,
            size,
            block_size: table.block_size,
            set_params: table.set_params,
            get_params: table.get_params,
            flags,
            binding: provider.bind_method(name),
        })))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn provider(&self) -> &ProviderHandle {
        self.0.binding.provider()
    }

    /// Number of live references to this method
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn supports_streaming(&self) -> bool {
        self.0.streaming.is_some()
    }

    pub fn supports_copy(&self) -> bool {
        self.0.dupctx.is_some()
    }

    pub(crate) fn streaming(&self) -> Option<&StreamingFunctions> {
        self.0.streaming.as_ref()
    }

    pub(crate) fn oneshot(&self) -> Option<&DigestOneShotFn> {
        self.0.digest.as_ref()
    }

    pub(crate) fn dupctx(&self) -> Option<&DupCtxFn> {
        self.0.dupctx.as_ref()
    }

    pub(crate) fn set_params(&self) -> Option<&SetCtxParamsFn> {
        self.0.set_params.as_ref()
    }

    pub(crate) fn get_params(&self) -> Option<&GetCtxParamsFn> {
        self.0.get_params.as_ref()
    }
}

fn missing(function: &'static str) -> impl FnOnce() -> ConstructionError {
    move || ConstructionError::IncompleteDispatch(format!("missing {function} function"))
}

/// A resolved digest algorithm
#[derive(Clone)]
pub enum DigestMethod {
    /// Static built-in working on a raw scratch buffer
    Legacy(&'static LegacyDigest),
    /// Implementation from a provider
    Provided(ProvidedDigest),
}

impl DigestMethod {
    pub fn name(&self) -> &str {
        match self {
            Self::Legacy(legacy) => legacy.name,
            Self::Provided(provided) => provided.name(),
        }
    }

    /// Digest output size in bytes (default output length for XOFs)
    pub fn size(&self) -> usize {
        match self {
            Self::Legacy(legacy) => legacy.md_size,
            Self::Provided(provided) => (provided.0.size)(),
        }
    }

    /// Input block size in bytes, 0 when the implementation does not say
    pub fn block_size(&self) -> usize {
        match self {
            Self::Legacy(legacy) => legacy.block_size,
            Self::Provided(provided) => provided.0.block_size.as_ref().map_or(0, |f| f()),
        }
    }

    pub fn flags(&self) -> DigestFlags {
        match self {
            Self::Legacy(legacy) => legacy.flags,
            Self::Provided(provided) => provided.0.flags,
        }
    }

    /// Whether the method produces extendable output
    pub fn is_xof(&self) -> bool {
        self.flags().contains(DigestFlags::XOF)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Number of live references; `None` for static legacy built-ins
    pub fn ref_count(&self) -> Option<usize> {
        match self {
            Self::Legacy(_) => None,
            Self::Provided(provided) => Some(provided.ref_count()),
        }
    }
}

impl FetchableMethod for DigestMethod {
    const OPERATION: OperationId = OperationId::DIGEST;

    fn from_dispatch(
        name: &str,
        implementation: &Implementation,
        provider: &ProviderHandle,
    ) -> Result<Self, ConstructionError> {
        match implementation {
            Implementation::Digest(functions) => {
                ProvidedDigest::from_functions(name, functions, provider).map(Self::Provided)
            }
            other => Err(ConstructionError::WrongOperation {
                expected: Self::OPERATION,
                found: other.operation(),
            }),
        }
    }

    fn name(&self) -> &str {
        DigestMethod::name(self)
    }

    fn provider(&self) -> Option<&ProviderHandle> {
        match self {
            Self::Legacy(_) => None,
            Self::Provided(provided) => Some(provided.provider()),
        }
    }

    fn same_method(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Legacy(a), Self::Legacy(b)) => std::ptr::eq(*a, *b),
            (Self::Provided(a), Self::Provided(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl fmt::Debug for DigestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy(legacy) => write!(f, "DigestMethod::Legacy({})", legacy.name),
            Self::Provided(provided) => write!(
                f,
                "DigestMethod::Provided({} from {})",
                provided.name(),
                provided.provider().name()
            ),
        }
    }
}
