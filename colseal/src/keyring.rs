//! Immutable registry of derived key sets.

use crate::error::Error;
use crate::kdf::{derive_key_set, DerivedKeySet};
use crate::key_provider::KeyProvider;
use std::collections::BTreeMap;

/// Ordered map of key id to [`DerivedKeySet`], with a designated default.
///
/// Built once from a [`KeyProvider`] and never mutated afterwards; rotation
/// changes which id is the default by constructing a new ring at the caller
/// level. The provider call at construction is the only place the engine may
/// touch I/O.
pub struct KeyRing {
    keys: BTreeMap<String, DerivedKeySet>,
    default_key_id: String,
}

impl KeyRing {
    /// Builds a ring by deriving a key set for every active key id.
    ///
    /// Master keys fetched from the provider are dropped (and zeroed) as
    /// soon as their derived set is cached.
    ///
    /// # Errors
    ///
    /// Returns a provider error if keys cannot be fetched, a derivation
    /// error for malformed key material, or `Error::KeyNotFound` if the
    /// provider's default id is not among its active ids.
    pub fn from_provider<P: KeyProvider>(provider: &P) -> Result<Self, Error> {
        let default_key_id = provider.default_key_id()?;

        let mut key_ids = provider.active_key_ids()?;
        key_ids.sort_unstable();

        let mut keys = BTreeMap::new();
        for key_id in key_ids {
            let master = provider.get_key(&key_id)?;
            let derived = derive_key_set(&master)?;
            keys.insert(key_id, derived);
        }

        if !keys.contains_key(&default_key_id) {
            return Err(Error::KeyNotFound(default_key_id));
        }

        Ok(Self { keys, default_key_id })
    }

    /// Returns the derived key set for `key_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the id is not active.
    pub fn get(&self, key_id: &str) -> Result<&DerivedKeySet, Error> {
        self.keys.get(key_id).ok_or_else(|| Error::KeyNotFound(key_id.to_string()))
    }

    /// Returns the default key id for new encryptions.
    #[must_use]
    pub fn default_key_id(&self) -> &str {
        &self.default_key_id
    }

    /// Returns all active key ids in sorted order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Iterates `(key_id, key_set)` pairs in sorted id order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &DerivedKeySet)> {
        self.keys.iter().map(|(id, set)| (id.as_str(), set))
    }
}
