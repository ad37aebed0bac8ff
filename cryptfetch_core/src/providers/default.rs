//! The built-in "default" provider
//!
//! Offers the SHA-1, SHA-2, SHA-3, SHAKE, MD5 and MD5-SHA1 digests, all with
//! the property definition `provider=default`. The hash functions themselves
//! come from the RustCrypto crates; this module only adapts them to digest
//! dispatch tables.

use crate::digest::DigestFlags;
use crate::dispatch::{DigestFunction, ProviderContext, state_mut, state_ref};
use crate::error::implementation::{ImplResult, ImplementationError};
use crate::method::OperationId;
use crate::params::{
    DIGEST_PARAM_MICALG, DIGEST_PARAM_XOFLEN, PROV_PARAM_BUILDINFO, PROV_PARAM_NAME,
    PROV_PARAM_VERSION, ParamValue, Params,
};
use crate::provider::{Algorithm, Implementation, Provider};
use md5::Md5;
use sha1::Sha1;
use sha2::digest::{Digest, ExtendableOutput, Update, XofReader};
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512, Shake128, Shake256};

/// Property definition of every algorithm of the default provider
pub const DEFAULT_PROPERTIES: &str = "provider=default";

/// Provider of the digests shipped with the library
pub struct DefaultProvider {
    digests: Vec<Algorithm>,
}

impl Default for DefaultProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultProvider {
    pub const NAME: &'static str = "default";

    pub fn new() -> Self {
        Self {
            digests: digest_table(),
        }
    }
}

impl Provider for DefaultProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn query_operation(&self, operation: OperationId) -> Option<&[Algorithm]> {
        match operation {
            OperationId::DIGEST => Some(&self.digests),
            _ => None,
        }
    }

    fn params(&self) -> Params {
        let version = env!("CARGO_PKG_VERSION");
        Params::new()
            .with(
                PROV_PARAM_NAME,
                ParamValue::Utf8("cryptfetch Default Provider".to_string()),
            )
            .with(PROV_PARAM_VERSION, ParamValue::Utf8(version.to_string()))
            .with(
                PROV_PARAM_BUILDINFO,
                ParamValue::Utf8(format!("cryptfetch {version}")),
            )
    }
}

fn digest(names: &str, functions: Vec<DigestFunction>) -> Algorithm {
    Algorithm::new(names, DEFAULT_PROPERTIES, Implementation::Digest(functions))
}

fn digest_table() -> Vec<Algorithm> {
    vec![
        digest("SHA1:SHA-1:SSL3-SHA1", fixed::<Sha1>(64, Some("sha-1"))),
        digest("SHA2-224:SHA-224:SHA224", fixed::<Sha224>(64, Some("sha-224"))),
        digest("SHA2-256:SHA-256:SHA256", fixed::<Sha256>(64, Some("sha-256"))),
        digest("SHA2-384:SHA-384:SHA384", fixed::<Sha384>(128, Some("sha-384"))),
        digest("SHA2-512:SHA-512:SHA512", fixed::<Sha512>(128, Some("sha-512"))),
        digest("SHA2-512/224:SHA-512/224:SHA512-224", fixed::<Sha512_224>(128, None)),
        digest("SHA2-512/256:SHA-512/256:SHA512-256", fixed::<Sha512_256>(128, None)),
        digest("SHA3-224", fixed::<Sha3_224>(144, None)),
        digest("SHA3-256", fixed::<Sha3_256>(136, None)),
        digest("SHA3-384", fixed::<Sha3_384>(104, None)),
        digest("SHA3-512", fixed::<Sha3_512>(72, None)),
        digest("SHAKE-128:SHAKE128", extendable::<Shake128>(168, 16)),
        digest("SHAKE-256:SHAKE256", extendable::<Shake256>(136, 32)),
        digest("MD5:SSL3-MD5", fixed::<Md5>(64, Some("md5"))),
        digest("MD5-SHA1", md5_sha1()),
    ]
}

/// First `len` bytes of `out`
fn output_prefix(out: &mut [u8], len: usize) -> ImplResult<&mut [u8]> {
    let available = out.len();
    out.get_mut(..len)
        .ok_or_else(|| ImplementationError::output_too_small(len, available))
}

fn write_output(out: &mut [u8], digest: &[u8]) -> ImplResult<usize> {
    output_prefix(out, digest.len())?.copy_from_slice(digest);
    Ok(digest.len())
}

/// Dispatch table of a fixed-size RustCrypto digest
fn fixed<H>(block_size: usize, micalg: Option<&'static str>) -> Vec<DigestFunction>
where
    H: Digest + Clone + Send + 'static,
{
    let mut functions = vec![
        DigestFunction::new_ctx(|| Some(Box::new(H::new()) as ProviderContext)),
        DigestFunction::init(|ctx| {
            *state_mut::<H>(ctx, "digest")? = H::new();
            Ok(())
        }),
        DigestFunction::update(|ctx, data| {
            Digest::update(state_mut::<H>(ctx, "digest")?, data);
            Ok(())
        }),
        DigestFunction::finalize(|ctx, out| {
            let hasher = std::mem::replace(state_mut::<H>(ctx, "digest")?, H::new());
            write_output(out, &hasher.finalize())
        }),
        DigestFunction::digest(|data, out| write_output(out, &H::digest(data))),
        DigestFunction::free_ctx(drop),
        DigestFunction::dup_ctx(|ctx| {
            let hasher = state_ref::<H>(ctx, "digest").ok()?;
            Some(Box::new(hasher.clone()) as ProviderContext)
        }),
        DigestFunction::size(<H as Digest>::output_size()),
        DigestFunction::block_size(block_size),
    ];
    if let Some(micalg) = micalg {
        functions.push(DigestFunction::get_params(move |_ctx, params| {
            params.set(DIGEST_PARAM_MICALG, ParamValue::Utf8(micalg.to_string()));
            Ok(())
        }));
    }
    functions
}

#[derive(Clone)]
struct XofState<H> {
    hasher: H,
    output_len: usize,
}

/// Dispatch table of an extendable-output RustCrypto hash.
///
/// The output length defaults to `default_len` and is changed through the
/// `xoflen` parameter.
fn extendable<H>(block_size: usize, default_len: usize) -> Vec<DigestFunction>
where
    H: Default + Update + ExtendableOutput + Clone + Send + 'static,
{
    vec![
        DigestFunction::new_ctx(move || {
            Some(Box::new(XofState {
                hasher: H::default(),
                output_len: default_len,
            }) as ProviderContext)
        }),
        DigestFunction::init(move |ctx| {
            let state = state_mut::<XofState<H>>(ctx, "xof")?;
            state.hasher = H::default();
            state.output_len = default_len;
            Ok(())
        }),
        DigestFunction::update(|ctx, data| {
            Update::update(&mut state_mut::<XofState<H>>(ctx, "xof")?.hasher, data);
            Ok(())
        }),
        DigestFunction::finalize(|ctx, out| {
            let state = state_mut::<XofState<H>>(ctx, "xof")?;
            let len = state.output_len;
            let target = output_prefix(out, len)?;
            let mut reader = std::mem::take(&mut state.hasher).finalize_xof();
            reader.read(target);
            Ok(len)
        }),
        DigestFunction::digest(move |data, out| {
            let target = output_prefix(out, default_len)?;
            let mut hasher = H::default();
            Update::update(&mut hasher, data);
            hasher.finalize_xof().read(target);
            Ok(default_len)
        }),
        DigestFunction::free_ctx(drop),
        DigestFunction::dup_ctx(|ctx| {
            let state = state_ref::<XofState<H>>(ctx, "xof").ok()?;
            Some(Box::new(state.clone()) as ProviderContext)
        }),
        DigestFunction::set_params(|ctx, params| {
            if !params.contains(DIGEST_PARAM_XOFLEN) {
                return Ok(());
            }
            match params.get_size(DIGEST_PARAM_XOFLEN) {
                Some(len) if len > 0 => {
                    state_mut::<XofState<H>>(ctx, "xof")?.output_len = len;
                    Ok(())
                }
                _ => Err(ImplementationError::new("xoflen must be a positive size")),
            }
        }),
        DigestFunction::get_params(|ctx, params| {
            let state = state_ref::<XofState<H>>(ctx, "xof")?;
            params.set(DIGEST_PARAM_XOFLEN, ParamValue::Size(state.output_len));
            Ok(())
        }),
        DigestFunction::size(default_len),
        DigestFunction::block_size(block_size),
        DigestFunction::flags(DigestFlags::XOF),
    ]
}

/// MD5 and SHA-1 of the same message, concatenated (TLS 1.0 handshake hash)
#[derive(Clone, Default)]
struct Md5Sha1 {
    md5: Md5,
    sha1: Sha1,
}

const MD5_SHA1_SIZE: usize = 16 + 20;

impl Md5Sha1 {
    fn absorb(&mut self, data: &[u8]) {
        Digest::update(&mut self.md5, data);
        Digest::update(&mut self.sha1, data);
    }

    fn finish(self, out: &mut [u8]) -> ImplResult<usize> {
        let target = output_prefix(out, MD5_SHA1_SIZE)?;
        target[..16].copy_from_slice(&self.md5.finalize());
        target[16..].copy_from_slice(&self.sha1.finalize());
        Ok(MD5_SHA1_SIZE)
    }
}

fn md5_sha1() -> Vec<DigestFunction> {
    vec![
        DigestFunction::new_ctx(|| Some(Box::new(Md5Sha1::default()) as ProviderContext)),
        DigestFunction::init(|ctx| {
            *state_mut::<Md5Sha1>(ctx, "MD5-SHA1")? = Md5Sha1::default();
            Ok(())
        }),
        DigestFunction::update(|ctx, data| {
            state_mut::<Md5Sha1>(ctx, "MD5-SHA1")?.absorb(data);
            Ok(())
        }),
        DigestFunction::finalize(|ctx, out| {
            std::mem::take(state_mut::<Md5Sha1>(ctx, "MD5-SHA1")?).finish(out)
        }),
        DigestFunction::free_ctx(drop),
        DigestFunction::dup_ctx(|ctx| {
            let state = state_ref::<Md5Sha1>(ctx, "MD5-SHA1").ok()?;
            Some(Box::new(state.clone()) as ProviderContext)
        }),
        DigestFunction::size(MD5_SHA1_SIZE),
        DigestFunction::block_size(64),
    ]
}
