//! Toy algorithm implementations
//!
//! None of these are cryptographic. They are small enough that expected
//! outputs can be computed by hand in a test.

use cryptfetch_core::dispatch::{state_mut, state_ref};
use cryptfetch_core::error::ImplementationError;
use cryptfetch_core::params::{DIGEST_PARAM_XOFLEN, ParamValue};
use cryptfetch_core::{DigestFlags, DigestFunction, KeyExchangeFunction, ProviderContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Output size of the byte-sum digest
pub const BYTE_SUM_SIZE: usize = 8;

/// Expected byte-sum digest of `data`: `seed` plus every byte, as a big-endian u64
pub fn byte_sum(seed: u8, data: &[u8]) -> [u8; BYTE_SUM_SIZE] {
    data.iter()
        .fold(u64::from(seed), |acc, b| acc.wrapping_add(u64::from(*b)))
        .to_be_bytes()
}

/// First `len` bytes of `out`
fn output_prefix(out: &mut [u8], len: usize) -> Result<&mut [u8], ImplementationError> {
    let available = out.len();
    out.get_mut(..len)
        .ok_or_else(|| ImplementationError::output_too_small(len, available))
}

/// Builds byte-sum digest tables with selected functions left out
pub struct DigestTableBuilder {
    seed: u8,
    streaming: bool,
    oneshot: bool,
    copy: bool,
    size: bool,
    omit: Vec<u32>,
    freed: Option<Arc<AtomicUsize>>,
}

impl Default for DigestTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestTableBuilder {
    /// Complete table: streaming, one-shot, copy and size
    pub fn new() -> Self {
        Self {
            seed: 0,
            streaming: true,
            oneshot: true,
            copy: true,
            size: true,
            omit: Vec::new(),
            freed: None,
        }
    }

    /// Start every sum at `seed` so implementations can be told apart by output
    pub fn with_seed(mut self, seed: u8) -> Self {
        self.seed = seed;
        self
    }

    /// Leave out newctx, init, update, final and freectx
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn without_oneshot(mut self) -> Self {
        self.oneshot = false;
        self
    }

    pub fn without_copy(mut self) -> Self {
        self.copy = false;
        self
    }

    pub fn without_size(mut self) -> Self {
        self.size = false;
        self
    }

    /// Leave out a single function by its dispatch id
    pub fn omit(mut self, function_id: u32) -> Self {
        self.omit.push(function_id);
        self
    }

    /// Count freed contexts in `counter`
    pub fn count_frees(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.freed = Some(counter);
        self
    }

    pub fn build(self) -> Vec<DigestFunction> {
        let seed = u64::from(self.seed);
        let mut functions = Vec::new();

        if self.streaming {
            let freed = self.freed.clone();
            functions.extend([
                DigestFunction::new_ctx(move || Some(Box::new(seed) as ProviderContext)),
                DigestFunction::init(move |ctx| {
                    *state_mut::<u64>(ctx, "byte sum")? = seed;
                    Ok(())
                }),
                DigestFunction::update(|ctx, data| {
                    let sum = state_mut::<u64>(ctx, "byte sum")?;
                    *sum = data
                        .iter()
                        .fold(*sum, |acc, b| acc.wrapping_add(u64::from(*b)));
                    Ok(())
                }),
                DigestFunction::finalize(|ctx, out| {
                    let sum = *state_mut::<u64>(ctx, "byte sum")?;
                    let target = output_prefix(out, BYTE_SUM_SIZE)?;
                    target.copy_from_slice(&sum.to_be_bytes());
                    Ok(BYTE_SUM_SIZE)
                }),
                DigestFunction::free_ctx(move |_ctx| {
                    if let Some(freed) = &freed {
                        freed.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            ]);
        }
        if self.oneshot {
            let seed = self.seed;
            functions.push(DigestFunction::digest(move |data, out| {
                let target = output_prefix(out, BYTE_SUM_SIZE)?;
                target.copy_from_slice(&byte_sum(seed, data));
                Ok(BYTE_SUM_SIZE)
            }));
        }
        if self.copy {
            functions.push(DigestFunction::dup_ctx(|ctx| {
                let sum = *state_ref::<u64>(ctx, "byte sum").ok()?;
                Some(Box::new(sum) as ProviderContext)
            }));
        }
        if self.size {
            functions.push(DigestFunction::size(BYTE_SUM_SIZE));
            functions.push(DigestFunction::block_size(1));
        }

        functions.retain(|function| !self.omit.contains(&function.id()));
        functions
    }
}

#[derive(Clone)]
struct CounterXof {
    sum: u8,
    output_len: usize,
}

/// Extendable-output toy digest: byte `i` of the output is `sum + i`.
///
/// The default output length is 16 and the `xoflen` parameter changes it.
pub fn toy_xof() -> Vec<DigestFunction> {
    const DEFAULT_LEN: usize = 16;
    vec![
        DigestFunction::new_ctx(|| {
            Some(Box::new(CounterXof {
                sum: 0,
                output_len: DEFAULT_LEN,
            }) as ProviderContext)
        }),
        DigestFunction::init(|ctx| {
            let state = state_mut::<CounterXof>(ctx, "counter xof")?;
            state.sum = 0;
            state.output_len = DEFAULT_LEN;
            Ok(())
        }),
        DigestFunction::update(|ctx, data| {
            let state = state_mut::<CounterXof>(ctx, "counter xof")?;
            state.sum = data.iter().fold(state.sum, |acc, b| acc.wrapping_add(*b));
            Ok(())
        }),
        DigestFunction::finalize(|ctx, out| {
            let state = state_mut::<CounterXof>(ctx, "counter xof")?;
            let len = state.output_len;
            let target = output_prefix(out, len)?;
            for (i, byte) in target.iter_mut().enumerate() {
                *byte = state.sum.wrapping_add(i as u8);
            }
            Ok(len)
        }),
        DigestFunction::free_ctx(drop),
        DigestFunction::dup_ctx(|ctx| {
            let state = state_ref::<CounterXof>(ctx, "counter xof").ok()?;
            Some(Box::new(state.clone()) as ProviderContext)
        }),
        DigestFunction::set_params(|ctx, params| {
            if let Some(len) = params.get_size(DIGEST_PARAM_XOFLEN) {
                state_mut::<CounterXof>(ctx, "counter xof")?.output_len = len;
            }
            Ok(())
        }),
        DigestFunction::get_params(|ctx, params| {
            let state = state_ref::<CounterXof>(ctx, "counter xof")?;
            params.set(DIGEST_PARAM_XOFLEN, ParamValue::Size(state.output_len));
            Ok(())
        }),
        DigestFunction::size(DEFAULT_LEN),
        DigestFunction::flags(DigestFlags::XOF),
    ]
}

#[derive(Clone, Default)]
struct XorExchange {
    key: Vec<u8>,
    peer: Option<Vec<u8>>,
}

/// Key "agreement" that XORs the local key with the peer key
pub fn xor_key_exchange() -> Vec<KeyExchangeFunction> {
    vec![
        KeyExchangeFunction::new_ctx(|| Some(Box::new(XorExchange::default()) as ProviderContext)),
        KeyExchangeFunction::init(|ctx, key| {
            let state = state_mut::<XorExchange>(ctx, "xor exchange")?;
            state.key = key.to_vec();
            state.peer = None;
            Ok(())
        }),
        KeyExchangeFunction::set_peer(|ctx, peer| {
            let state = state_mut::<XorExchange>(ctx, "xor exchange")?;
            if peer.len() != state.key.len() {
                return Err(ImplementationError::new("peer key length differs"));
            }
            state.peer = Some(peer.to_vec());
            Ok(())
        }),
        KeyExchangeFunction::derive(|ctx, out| {
            let state = state_mut::<XorExchange>(ctx, "xor exchange")?;
            let peer = state
                .peer
                .as_ref()
                .ok_or_else(|| ImplementationError::new("no peer key set"))?;
            let len = state.key.len();
            if let Some(out) = out {
                let target = output_prefix(out, len)?;
                for ((byte, k), p) in target.iter_mut().zip(&state.key).zip(peer) {
                    *byte = k ^ p;
                }
            }
            Ok(len)
        }),
        KeyExchangeFunction::free_ctx(drop),
        KeyExchangeFunction::dup_ctx(|ctx| {
            let state = state_ref::<XorExchange>(ctx, "xor exchange").ok()?;
            Some(Box::new(state.clone()) as ProviderContext)
        }),
    ]
}
