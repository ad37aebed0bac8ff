//! Operation kinds, method identities and the fetchable method contract
//!
//! A method identity mixes the name identity with the operation identity,
//! assuming no more than 2^24 names and 2^8 operation kinds:
//!
//! ```text
//! +---------24 bits--------+-8 bits-+
//! |      name identity     | op id  |
//! +------------------------+--------+
//! ```

use crate::name_map::NameId;
use crate::provider::{Implementation, ProviderHandle};
use std::fmt;

/// Category of cryptographic capability a provider can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u32);

impl OperationId {
    /// Message digests
    pub const DIGEST: Self = Self(1);
    /// Symmetric ciphers
    pub const CIPHER: Self = Self(2);
    /// Key management
    pub const KEYMGMT: Self = Self(10);
    /// Key exchange
    pub const KEYEXCH: Self = Self(11);

    /// Largest operation id that fits in a method identity
    pub const MAX: u32 = (1 << 8) - 1;

    /// Create an operation id for a provider-defined operation kind
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric id
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Short lowercase name used in logs and error messages
    pub fn name(self) -> &'static str {
        match self {
            Self::DIGEST => "digest",
            Self::CIPHER => "cipher",
            Self::KEYMGMT => "keymgmt",
            Self::KEYEXCH => "keyexch",
            _ => "custom",
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Composite key identifying one named algorithm of one operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);

impl MethodId {
    /// The reserved, never stored identity
    pub const INVALID: Self = Self(0);

    /// Largest name id that fits in a method identity
    pub const MAX_NAME_ID: NameId = (1 << 24) - 1;

    /// Pack an operation id and a name id into an identity.
    ///
    /// Returns [`MethodId::INVALID`] when either component is zero or does
    /// not fit its bit field.
    pub fn pack(operation: OperationId, name_id: NameId) -> Self {
        let op = operation.get();
        if name_id == 0 || name_id > Self::MAX_NAME_ID || op == 0 || op > OperationId::MAX {
            return Self::INVALID;
        }
        Self((name_id << 8) | op)
    }

    /// Split a valid identity back into its operation and name ids
    pub fn unpack(self) -> Option<(OperationId, NameId)> {
        if !self.is_valid() {
            return None;
        }
        Some((OperationId::new(self.0 & 0xFF), self.0 >> 8))
    }

    /// Whether this identity may be stored or looked up
    pub fn is_valid(self) -> bool {
        self.0 != 0 && self.0 & 0xFF != 0 && self.0 >> 8 != 0
    }

    /// Raw 32-bit identity
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Why a candidate method could not be built from a provider's dispatch table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// The implementation belongs to another operation kind
    WrongOperation {
        expected: OperationId,
        found: OperationId,
    },
    /// The dispatch table is not a consistent set of functions
    IncompleteDispatch(String),
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongOperation { expected, found } => {
                write!(f, "expected a {expected} implementation, found {found}")
            }
            Self::IncompleteDispatch(reason) => write!(f, "inconsistent dispatch table: {reason}"),
        }
    }
}

impl std::error::Error for ConstructionError {}

/// A reference-counted method object the resolver can construct, store and cache
///
/// Cloning a method takes a new reference; dropping releases it. The
/// implementation behind the method is destroyed with the last reference.
pub trait FetchableMethod: Clone + Send + Sync + 'static {
    /// Operation kind this method implements
    const OPERATION: OperationId;

    /// Build a method from one provider algorithm entry.
    ///
    /// `name` is the primary name of the algorithm entry.
    fn from_dispatch(
        name: &str,
        implementation: &Implementation,
        provider: &ProviderHandle,
    ) -> Result<Self, ConstructionError>;

    /// Primary algorithm name
    fn name(&self) -> &str;

    /// Provider that supplied the method, if any
    fn provider(&self) -> Option<&ProviderHandle>;

    /// Whether two handles refer to the same method object
    fn same_method(&self, other: &Self) -> bool;
}
