//! Legacy built-in digests
//!
//! Legacy digests are static descriptors whose callbacks operate on a raw
//! scratch buffer of `ctx_size` bytes owned by the digest context. They are
//! never stored in a registry; the digest context handles them directly and
//! `Registry::get_digest` falls back to them by name.

use super::method::DigestFlags;
use crate::error::implementation::{ImplResult, ImplementationError};
use std::fmt;

/// Control requests understood by legacy digests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCtrl {
    /// Set the output length of an extendable-output digest
    XofLen(usize),
}

/// Static description of a legacy digest
pub struct LegacyDigest {
    pub name: &'static str,
    pub md_size: usize,
    pub block_size: usize,
    /// Size of the scratch buffer the callbacks work on
    pub ctx_size: usize,
    pub flags: DigestFlags,
    pub init: fn(&mut [u8]) -> ImplResult<()>,
    pub update: fn(&mut [u8], &[u8]) -> ImplResult<()>,
    /// Write `out.len()` digest bytes
    pub finish: fn(&mut [u8], &mut [u8]) -> ImplResult<()>,
    /// Release anything the scratch state refers to
    pub cleanup: Option<fn(&mut [u8])>,
    /// Fix up a byte-wise copy of the scratch state (`dst`, `src`)
    pub copy: Option<fn(&mut [u8], &[u8]) -> ImplResult<()>>,
    pub ctrl: Option<fn(&mut [u8], LegacyCtrl) -> ImplResult<()>>,
}

impl fmt::Debug for LegacyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyDigest")
            .field("name", &self.name)
            .field("md_size", &self.md_size)
            .field("ctx_size", &self.ctx_size)
            .finish()
    }
}

fn crc32_state(scratch: &[u8]) -> ImplResult<u32> {
    let bytes: [u8; 4] = scratch
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| ImplementationError::new("CRC32 scratch state is too short"))?;
    Ok(u32::from_le_bytes(bytes))
}

fn crc32_init(scratch: &mut [u8]) -> ImplResult<()> {
    crc32_state(scratch)?;
    scratch[..4].copy_from_slice(&0u32.to_le_bytes());
    Ok(())
}

fn crc32_update(scratch: &mut [u8], data: &[u8]) -> ImplResult<()> {
    let mut hasher = crc32fast::Hasher::new_with_initial(crc32_state(scratch)?);
    hasher.update(data);
    scratch[..4].copy_from_slice(&hasher.finalize().to_le_bytes());
    Ok(())
}

fn crc32_finish(scratch: &mut [u8], out: &mut [u8]) -> ImplResult<()> {
    let crc = crc32_state(scratch)?;
    if out.len() < 4 {
        return Err(ImplementationError::output_too_small(4, out.len()));
    }
    out[..4].copy_from_slice(&crc.to_be_bytes());
    Ok(())
}

/// CRC-32 (IEEE), output in big-endian byte order
pub static CRC32: LegacyDigest = LegacyDigest {
    name: "CRC32",
    md_size: 4,
    block_size: 1,
    ctx_size: 4,
    flags: DigestFlags::empty(),
    init: crc32_init,
    update: crc32_update,
    finish: crc32_finish,
    cleanup: None,
    copy: None,
    ctrl: None,
};

fn null_init(_scratch: &mut [u8]) -> ImplResult<()> {
    Ok(())
}

fn null_update(_scratch: &mut [u8], _data: &[u8]) -> ImplResult<()> {
    Ok(())
}

fn null_finish(_scratch: &mut [u8], _out: &mut [u8]) -> ImplResult<()> {
    Ok(())
}

/// Digest with an empty output, accepting any input
pub static NULL_DIGEST: LegacyDigest = LegacyDigest {
    name: "NULL",
    md_size: 0,
    block_size: 0,
    ctx_size: 0,
    flags: DigestFlags::empty(),
    init: null_init,
    update: null_update,
    finish: null_finish,
    cleanup: None,
    copy: None,
    ctrl: None,
};

static BUILTINS: [&LegacyDigest; 2] = [&CRC32, &NULL_DIGEST];

/// All legacy built-ins
pub fn builtin_digests() -> &'static [&'static LegacyDigest] {
    &BUILTINS
}

/// Find a legacy built-in by case-insensitive name
pub fn find_builtin(name: &str) -> Option<&'static LegacyDigest> {
    let name = name.trim();
    BUILTINS
        .iter()
        .copied()
        .find(|digest| digest.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_builtin() {
        assert!(std::ptr::eq(find_builtin("crc32").unwrap(), &CRC32));
        assert!(std::ptr::eq(find_builtin(" null ").unwrap(), &NULL_DIGEST));
        assert!(find_builtin("SHA256").is_none());
        assert_eq!(builtin_digests().len(), 2);
    }

    #[test]
    fn test_crc32_callbacks() {
        let mut scratch = [0xAAu8; 4];
        (CRC32.init)(&mut scratch).unwrap();
        (CRC32.update)(&mut scratch, b"1234").unwrap();
        (CRC32.update)(&mut scratch, b"56789").unwrap();
        let mut out = [0u8; 4];
        (CRC32.finish)(&mut scratch, &mut out).unwrap();
        assert_eq!(u32::from_be_bytes(out), 0xCBF4_3926);
    }

    #[test]
    fn test_crc32_rejects_short_scratch() {
        let mut scratch = [0u8; 2];
        assert!((CRC32.init)(&mut scratch).is_err());
    }
}
