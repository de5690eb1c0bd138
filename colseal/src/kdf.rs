//! Key derivation using HKDF (HMAC-based Key Derivation Function).
//!
//! Each master key is expanded into two independent 32-byte keys: one for
//! AEAD encryption and one for blind-index HMACs. The two derivations differ
//! only in their info label, so a master key is never used directly for two
//! cryptographic purposes.

use crate::error::Error;
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

/// Required master key size in bytes (256 bits).
pub const MASTER_KEY_SIZE: usize = 32;

/// Size of each derived key in bytes (256 bits).
pub const DERIVED_KEY_SIZE: usize = 32;

/// Domain-separation label for the AEAD encryption key.
const ENCRYPTION_INFO: &[u8] = b"encryption";

/// Domain-separation label for the blind-index HMAC key.
const INDEX_INFO: &[u8] = b"blind-index";

/// Encryption and HMAC keys derived from one master key.
///
/// The two keys are uniquely determined by the master key and their info
/// labels. Both are held in [`SecretVec`] and zeroed when dropped.
pub struct DerivedKeySet {
    encryption_key: SecretVec<u8>,
    hmac_key: SecretVec<u8>,
}

impl core::fmt::Debug for DerivedKeySet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DerivedKeySet")
            .field("encryption_key", &"[REDACTED]")
            .field("hmac_key", &"[REDACTED]")
            .finish()
    }
}

impl DerivedKeySet {
    /// Returns the AEAD encryption key.
    #[must_use]
    pub fn encryption_key(&self) -> &SecretVec<u8> {
        &self.encryption_key
    }

    /// Returns the blind-index HMAC key.
    #[must_use]
    pub fn hmac_key(&self) -> &SecretVec<u8> {
        &self.hmac_key
    }
}

/// Derives a [`DerivedKeySet`] from a 32-byte master key.
///
/// Deterministic: the same master key always yields the same key set. No
/// salt is used because master keys are required to be high-entropy and
/// unique per key id. The caller should drop the master key as soon as
/// derivation completes; [`SecretVec`] zeroes it on drop.
///
/// # Errors
///
/// Returns `Error::InvalidKeyLength` if the master key is not exactly
/// [`MASTER_KEY_SIZE`] bytes, or `Error::KeyDerivation` if HKDF expansion
/// fails.
pub fn derive_key_set(master_key: &SecretVec<u8>) -> Result<DerivedKeySet, Error> {
    let master = master_key.expose_secret();
    if master.len() != MASTER_KEY_SIZE {
        return Err(Error::InvalidKeyLength {
            expected: MASTER_KEY_SIZE,
            actual: master.len(),
        });
    }

    let hkdf = Hkdf::<Sha256>::new(None, master);

    let mut encryption_key = vec![0u8; DERIVED_KEY_SIZE];
    hkdf.expand(ENCRYPTION_INFO, &mut encryption_key).map_err(|_| Error::KeyDerivation)?;

    let mut hmac_key = vec![0u8; DERIVED_KEY_SIZE];
    hkdf.expand(INDEX_INFO, &mut hmac_key).map_err(|_| Error::KeyDerivation)?;

    Ok(DerivedKeySet {
        encryption_key: SecretVec::new(encryption_key),
        hmac_key: SecretVec::new(hmac_key),
    })
}
