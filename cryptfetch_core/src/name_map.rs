//! Bijection between algorithm names and compact numeric identities
//!
//! Names are matched case-insensitively. Several aliases may share one
//! identity (for example `SHA2-256`, `SHA-256` and `SHA256`). Identities are
//! assigned in increasing order starting at 1 and never change for the
//! lifetime of the map.

use crate::method::MethodId;
use log::{trace, warn};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Numeric name identity; 0 means "unknown"
pub type NameId = u32;

/// Separator between aliases in provider algorithm names
pub const ALIAS_SEPARATOR: char = ':';

#[derive(Default)]
struct NameMapInner {
    ids: HashMap<String, NameId>,
    /// Aliases per identity, indexed by `id - 1`, in registration order
    names: Vec<Vec<String>>,
}

impl NameMapInner {
    fn allocate(&mut self) -> NameId {
        let next = self.names.len() as u64 + 1;
        if next > u64::from(MethodId::MAX_NAME_ID) {
            return 0;
        }
        self.names.push(Vec::new());
        next as NameId
    }

    fn bind(&mut self, id: NameId, name: &str) {
        self.ids.insert(normalize(name), id);
        self.names[(id - 1) as usize].push(name.to_string());
    }
}

/// Thread-safe name to identity map
#[derive(Default)]
pub struct NameMap {
    inner: RwLock<NameMapInner>,
}

impl std::fmt::Debug for NameMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameMap").field("len", &self.len()).finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Split a provider algorithm name list (`"SHA2-256:SHA-256"`) into aliases
pub fn split_aliases(names: &str) -> impl Iterator<Item = &str> {
    names
        .split(ALIAS_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

impl NameMap {
    /// Create an empty name map
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the identity of a name, 0 if the name was never registered
    pub fn name_to_id(&self, name: &str) -> NameId {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ids.get(&normalize(name)).copied().unwrap_or(0)
    }

    /// Look up a name, assigning a fresh identity on first sight.
    ///
    /// Returns 0 only when the identity space is exhausted.
    pub fn id_or_add(&self, name: &str) -> NameId {
        if name.trim().is_empty() {
            return 0;
        }
        let existing = self.name_to_id(name);
        if existing != 0 {
            return existing;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have registered the name between the two locks
        if let Some(&id) = inner.ids.get(&normalize(name)) {
            return id;
        }
        let id = inner.allocate();
        if id != 0 {
            inner.bind(id, name);
            trace!("Registered name '{name}' as {id}");
        }
        id
    }

    /// Register a set of aliases under a single identity.
    ///
    /// If some aliases are already known their identity is reused; when they
    /// disagree the first known identity wins. Returns 0 when `names` holds no
    /// alias or the identity space is exhausted.
    pub fn add_aliases(&self, names: &str) -> NameId {
        let aliases: Vec<&str> = split_aliases(names).collect();
        if aliases.is_empty() {
            return 0;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut id = 0;
        for alias in &aliases {
            match inner.ids.get(&normalize(alias)) {
                Some(&known) if id == 0 => id = known,
                Some(&known) if known != id => {
                    warn!("Alias '{alias}' already names identity {known}, keeping {id} for '{names}'");
                }
                _ => {}
            }
        }
        if id == 0 {
            id = inner.allocate();
            if id == 0 {
                return 0;
            }
        }
        for alias in aliases {
            if !inner.ids.contains_key(&normalize(alias)) {
                inner.bind(id, alias);
            }
        }
        id
    }

    /// All aliases registered for an identity, in registration order
    pub fn names_of(&self, id: NameId) -> Vec<String> {
        if id == 0 {
            return Vec::new();
        }
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .names
            .get((id - 1) as usize)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of identities handed out
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names
            .len()
    }

    /// Whether no name has been registered yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
