//! Key rotation: re-sealing ciphertext under the current default key.
//!
//! Rotation is caller-driven: construct a vault whose provider designates
//! the new default while the old key stays active, then walk stored rows,
//! rotating the stale ones. Until a row is re-indexed, it remains findable
//! through its old-version tag via
//! [`blind_index_all`](crate::cipher::CipherVault::blind_index_all).

use crate::cipher::{CipherVault, SealedValue};
use crate::error::Error;
use crate::wire::OuterEnvelope;

impl CipherVault {
    /// Reports whether `ciphertext` was sealed under a non-default key.
    ///
    /// Malformed input returns `false`: rotation eligibility cannot be
    /// determined from bytes that do not parse, and silent non-action is the
    /// safer default. The actual failure surfaces when the caller tries to
    /// open the value.
    #[must_use]
    pub fn needs_rotation(&self, ciphertext: &[u8]) -> bool {
        let Ok(ring) = self.ring_checked() else {
            return false;
        };
        match OuterEnvelope::from_bytes(ciphertext) {
            Ok(envelope) => envelope.key_id() != ring.default_key_id(),
            Err(_) => false,
        }
    }

    /// Re-encrypts `ciphertext` under the current default key.
    ///
    /// Opens the value with whichever key version its envelope carries, then
    /// seals it fresh. The output gets a new nonce even when the key id is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Propagates any open error (unknown key, tampering, malformed input)
    /// and any seal error.
    pub fn rotate(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let plaintext = self.open(ciphertext)?;
        self.seal(&plaintext)
    }

    /// Re-encrypts and re-indexes `ciphertext` under the current default key.
    ///
    /// Returns a fresh [`SealedValue`] so the stored row's ciphertext, blind
    /// index, and key id stay mutually consistent after the update.
    ///
    /// # Errors
    ///
    /// Propagates open, seal, and index errors.
    pub fn rotate_indexed(&self, ciphertext: &[u8]) -> Result<SealedValue, Error> {
        let plaintext = self.open(ciphertext)?;
        self.seal_indexed(&plaintext)
    }

    /// Absent-value variant of [`CipherVault::rotate`]: `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates rotation errors for present values.
    pub fn rotate_opt(&self, ciphertext: Option<&[u8]>) -> Result<Option<Vec<u8>>, Error> {
        ciphertext.map(|c| self.rotate(c)).transpose()
    }
}
