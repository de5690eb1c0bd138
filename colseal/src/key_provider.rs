//! Key provider abstraction for master-key management.

use crate::error::KeyProviderError;
use secrecy::{ExposeSecret, SecretVec};
use std::collections::BTreeMap;

/// Supplies 32-byte master keys by id.
///
/// Implementations must be thread-safe (`Send + Sync`). A provider may reach
/// out to an external secret store; the cipher engine only calls it once, at
/// construction, so provider latency never sits on the seal/open path.
///
/// Iteration order from a provider is never trusted: the engine sorts every
/// id list it consumes.
pub trait KeyProvider: Send + Sync {
    /// Returns the master key for `key_id`.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::KeyNotFound` if no such key exists.
    fn get_key(&self, key_id: &str) -> Result<SecretVec<u8>, KeyProviderError>;

    /// Returns the id of the key used for new encryptions.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::NoDefaultKey` if none is configured.
    fn default_key_id(&self) -> Result<String, KeyProviderError>;

    /// Returns all active key ids, sorted.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the backing store cannot be listed.
    fn active_key_ids(&self) -> Result<Vec<String>, KeyProviderError>;
}

/// In-memory key provider backed by a static map.
///
/// Suitable for applications that load master keys from their own
/// configuration layer. The provider takes ownership of the key material;
/// [`SecretVec`] zeroes it when the provider is dropped.
pub struct StaticKeyProvider {
    keys: BTreeMap<String, SecretVec<u8>>,
    default_key_id: String,
}

impl StaticKeyProvider {
    /// Creates a provider from `(key_id, master_key)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::KeyNotFound` if `default_key_id` is not
    /// among the supplied keys.
    pub fn new(
        keys: impl IntoIterator<Item = (String, SecretVec<u8>)>,
        default_key_id: impl Into<String>,
    ) -> Result<Self, KeyProviderError> {
        let keys: BTreeMap<String, SecretVec<u8>> = keys.into_iter().collect();
        let default_key_id = default_key_id.into();

        if !keys.contains_key(&default_key_id) {
            return Err(KeyProviderError::KeyNotFound(default_key_id));
        }

        Ok(Self { keys, default_key_id })
    }
}

impl KeyProvider for StaticKeyProvider {
    fn get_key(&self, key_id: &str) -> Result<SecretVec<u8>, KeyProviderError> {
        self.keys
            .get(key_id)
            .map(|key| SecretVec::new(key.expose_secret().clone()))
            .ok_or_else(|| KeyProviderError::KeyNotFound(key_id.to_string()))
    }

    fn default_key_id(&self) -> Result<String, KeyProviderError> {
        Ok(self.default_key_id.clone())
    }

    fn active_key_ids(&self) -> Result<Vec<String>, KeyProviderError> {
        // BTreeMap iterates in sorted key order
        Ok(self.keys.keys().cloned().collect())
    }
}
