//! Cipher engine: seal and open operations over versioned keys.
//!
//! Sealing encrypts an inner plaintext (authenticated key id copy plus
//! payload) with XChaCha20-Poly1305 under the per-version encryption key and
//! wraps it in the outer envelope. Opening reverses each step and fails
//! closed at the first violation:
//!
//! ```text
//! Parsed -> KeyResolved -> Decrypted -> Decompressed -> InnerVerified -> Done
//! ```
//!
//! There is no retry or partial success; a call either returns the payload
//! or a typed error.

use crate::blind_index::BlindIndexTag;
use crate::compress::{CompressionMode, Compressor, MAX_PLAINTEXT_LEN};
use crate::error::Error;
use crate::key_provider::KeyProvider;
use crate::keyring::KeyRing;
use crate::wire::{self, OuterEnvelope, TransformFlag, NONCE_SIZE};
use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Ciphertext, blind index, and the key id that produced both.
///
/// Persist all three together so a row always carries a self-consistent key
/// version for its encrypted value and its search tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedValue {
    /// Encrypted value in the outer wire format
    pub ciphertext: Vec<u8>,
    /// Deterministic search tag for the same key version
    pub blind_index: BlindIndexTag,
    /// Key version that produced both fields
    pub key_id: String,
}

struct VaultInner {
    keyring: KeyRing,
    compressor: Compressor,
    compression: CompressionMode,
    closed: AtomicBool,
}

/// Cipher engine over an immutable set of derived key versions.
///
/// Cheap to clone (`Arc`-shared) and safe for concurrent use: every seal,
/// open, and index call touches only its own stack plus the read-only key
/// map. The single mutating lifecycle event is [`CipherVault::close`]; after
/// it, every operation fails with `UsedAfterTeardown`, and key bytes are
/// zeroed when the last clone drops.
///
/// # Example
///
/// ```ignore
/// use colseal::prelude::*;
///
/// let provider = FileKeyProvider::new("./keys")?;
/// let vault = CipherVault::new(&provider)?;
///
/// let sealed = vault.seal_indexed(b"alice@example.com")?;
/// let plaintext = vault.open(&sealed.ciphertext)?;
/// ```
#[derive(Clone)]
pub struct CipherVault {
    inner: Arc<VaultInner>,
}

impl CipherVault {
    /// Builds a vault from a provider, without compression.
    ///
    /// All master keys are fetched and derived here; this is the only point
    /// at which the provider (and any I/O behind it) is consulted.
    ///
    /// # Errors
    ///
    /// Returns provider or derivation errors, or `Error::KeyNotFound` if the
    /// provider's default id is not among its active keys.
    pub fn new<P: KeyProvider>(provider: &P) -> Result<Self, Error> {
        Self::with_compression(provider, CompressionMode::Off)
    }

    /// Builds a vault with an explicit compression mode.
    ///
    /// # Errors
    ///
    /// Same as [`CipherVault::new`].
    pub fn with_compression<P: KeyProvider>(
        provider: &P,
        compression: CompressionMode,
    ) -> Result<Self, Error> {
        let keyring = KeyRing::from_provider(provider)?;
        Ok(Self {
            inner: Arc::new(VaultInner {
                keyring,
                compressor: Compressor::default(),
                compression,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Returns the key id used for new encryptions.
    #[must_use]
    pub fn default_key_id(&self) -> &str {
        self.inner.keyring.default_key_id()
    }

    /// Returns all active key ids in sorted order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.inner.keyring.key_ids()
    }

    /// Marks the vault closed; every subsequent operation fails with
    /// `UsedAfterTeardown`.
    ///
    /// The flag is published with release ordering and checked with acquire
    /// ordering at the top of every operation. Key material itself is zeroed
    /// when the last clone of the vault drops, so an in-flight call can
    /// never observe partially-zeroed keys.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub(crate) fn ring_checked(&self) -> Result<&KeyRing, Error> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::UsedAfterTeardown);
        }
        Ok(&self.inner.keyring)
    }

    /// Encrypts `plaintext` under the default key.
    ///
    /// # Errors
    ///
    /// See [`CipherVault::seal_with`].
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let ring = self.ring_checked()?;
        self.seal_with(ring.default_key_id(), plaintext)
    }

    /// Encrypts `plaintext` under the key version `key_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UsedAfterTeardown` on a closed vault,
    /// `Error::KeyNotFound` for an unknown id, `Error::InvalidFormat` for an
    /// unencodable key id, or `Error::EncryptionFailed` if the AEAD
    /// operation fails.
    pub fn seal_with(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let ring = self.ring_checked()?;
        let key_set = ring.get(key_id)?;

        let inner = Zeroizing::new(wire::encode_inner(key_id, plaintext)?);

        let (payload, flag) = match self.inner.compression {
            CompressionMode::Off => (Zeroizing::new(inner.to_vec()), TransformFlag::None),
            CompressionMode::Zstd => match self.inner.compressor.compress(&inner) {
                Some(compressed) => (Zeroizing::new(compressed), TransformFlag::Zstd),
                None => (Zeroizing::new(inner.to_vec()), TransformFlag::None),
            },
        };

        // OsRng aborts the process on entropy-source failure; there is no
        // degraded-randomness path.
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from(nonce_bytes);

        let cipher = XChaCha20Poly1305::new_from_slice(key_set.encryption_key().expose_secret())
            .map_err(|e| Error::EncryptionFailed(format!("invalid derived key: {e}")))?;
        let sealed = cipher
            .encrypt(&nonce, payload.as_slice())
            .map_err(|e| Error::EncryptionFailed(format!("AEAD encryption failed: {e}")))?;

        OuterEnvelope::new(flag, key_id, nonce_bytes, sealed).to_bytes()
    }

    /// Decrypts a ciphertext using whichever key id its envelope carries.
    ///
    /// # Errors
    ///
    /// See [`CipherVault::open_with`].
    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        self.open_inner(ciphertext, None)
    }

    /// Decrypts a ciphertext, requiring its envelope to carry `key_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UsedAfterTeardown` on a closed vault,
    /// `Error::InvalidFormat` for malformed bytes, `Error::KeyIdMismatch` if
    /// the envelope id diverges from `key_id` or from the authenticated
    /// inner id, `Error::KeyNotFound` for an inactive key,
    /// `Error::DecryptionFailed` on authentication failure,
    /// `Error::DecompressionFailed` if the payload exceeds the expansion
    /// bound, and `Error::UnsupportedCompression` for the reserved flag.
    pub fn open_with(&self, key_id: &str, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        self.open_inner(ciphertext, Some(key_id))
    }

    fn open_inner(&self, ciphertext: &[u8], explicit_key_id: Option<&str>) -> Result<Vec<u8>, Error> {
        let ring = self.ring_checked()?;

        // Parsed
        let envelope = OuterEnvelope::from_bytes(ciphertext)?;
        let outer_id = envelope.key_id();

        if let Some(expected) = explicit_key_id {
            if !key_ids_match(expected.as_bytes(), outer_id.as_bytes()) {
                return Err(Error::KeyIdMismatch);
            }
        }

        // KeyResolved
        let key_set = ring.get(outer_id)?;

        // Decrypted. The AEAD failure is reported without detail: wrong key
        // and tampering are indistinguishable to the caller.
        let cipher = XChaCha20Poly1305::new_from_slice(key_set.encryption_key().expose_secret())
            .map_err(|_| Error::DecryptionFailed)?;
        let nonce = XNonce::from(*envelope.nonce());
        let decrypted = Zeroizing::new(
            cipher
                .decrypt(&nonce, envelope.sealed_payload())
                .map_err(|_| Error::DecryptionFailed)?,
        );

        // Decompressed
        let inner = match envelope.flag() {
            TransformFlag::None => decrypted,
            TransformFlag::Zstd => Zeroizing::new(
                self.inner.compressor.decompress(&decrypted, MAX_PLAINTEXT_LEN)?,
            ),
            TransformFlag::Reserved => {
                return Err(Error::UnsupportedCompression(TransformFlag::Reserved.as_u8()))
            }
        };

        // InnerVerified
        let (inner_id, payload) = wire::decode_inner(&inner)?;
        if !key_ids_match(inner_id, outer_id.as_bytes()) {
            return Err(Error::KeyIdMismatch);
        }

        Ok(payload.to_vec())
    }

    /// Encrypts and indexes `plaintext` under the default key.
    ///
    /// # Errors
    ///
    /// Propagates seal and index errors.
    pub fn seal_indexed(&self, plaintext: &[u8]) -> Result<SealedValue, Error> {
        let key_id = self.ring_checked()?.default_key_id().to_string();
        let ciphertext = self.seal_with(&key_id, plaintext)?;
        let blind_index = self.blind_index(&key_id, plaintext)?;

        Ok(SealedValue { ciphertext, blind_index, key_id })
    }

    /// Absent-value variant of [`CipherVault::seal`]: `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates seal errors for present values.
    pub fn seal_opt(&self, plaintext: Option<&[u8]>) -> Result<Option<Vec<u8>>, Error> {
        plaintext.map(|p| self.seal(p)).transpose()
    }

    /// Absent-value variant of [`CipherVault::open`]: `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates open errors for present values.
    pub fn open_opt(&self, ciphertext: Option<&[u8]>) -> Result<Option<Vec<u8>>, Error> {
        ciphertext.map(|c| self.open(c)).transpose()
    }

    /// Absent-value variant of [`CipherVault::seal_indexed`].
    ///
    /// # Errors
    ///
    /// Propagates seal and index errors for present values.
    pub fn seal_indexed_opt(
        &self,
        plaintext: Option<&[u8]>,
    ) -> Result<Option<SealedValue>, Error> {
        plaintext.map(|p| self.seal_indexed(p)).transpose()
    }
}

/// Constant-time key id comparison. The length check short-circuits, which
/// leaks only the length, already visible in the wire format.
pub(crate) fn key_ids_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
