//! Message digests: method objects and the streaming digest context
//!
//! A [`DigestMethod`] is either a provider-supplied implementation built from a
//! validated dispatch table or a static legacy built-in. [`DigestContext`]
//! drives both through the same init / update / final life cycle.

pub mod context;
pub mod legacy;
pub mod method;

pub use context::{ContextFlags, ContextState, DigestContext, digest_oneshot};
pub use legacy::{LegacyCtrl, LegacyDigest};
pub use method::{DigestFlags, DigestMethod, ProvidedDigest};
