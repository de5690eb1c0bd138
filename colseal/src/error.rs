//! Error types for `colseal` operations.

use std::fmt;

/// Main error type for `colseal` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Master key had the wrong length
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key length in bytes
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Key derivation failed
    #[error("key derivation failed")]
    KeyDerivation,

    /// No key with the given id is active in the vault
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Ciphertext bytes are structurally malformed
    #[error("invalid ciphertext format: {0}")]
    InvalidFormat(String),

    /// AEAD authentication failed (wrong key, tampering, or corruption)
    #[error("decryption failed: ciphertext may be corrupted or tampered")]
    DecryptionFailed,

    /// The unauthenticated outer key id does not match the authenticated
    /// inner key id (or an explicitly requested key id)
    #[error("key id mismatch between envelope and authenticated payload")]
    KeyIdMismatch,

    /// Decompression failed or the output exceeded the size bound
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Ciphertext carries a compression flag this build cannot reverse
    #[error("unsupported compression flag: {0:#04x}")]
    UnsupportedCompression(u8),

    /// Operation attempted after the vault was closed
    #[error("vault used after teardown")]
    UsedAfterTeardown,

    /// Key provider operation failed
    #[error("key provider error: {0}")]
    KeyProvider(#[from] KeyProviderError),
}

/// Errors specific to key provider operations.
#[derive(Debug)]
pub enum KeyProviderError {
    /// No master key with this id
    KeyNotFound(String),

    /// Provider has no default key configured
    NoDefaultKey,

    /// Stored key material is unusable (wrong size, bad encoding)
    InvalidKey(String),

    /// Backend is unreachable or refused the request
    Unavailable(String),

    /// I/O operation failed
    Io(std::io::Error),
}

impl fmt::Display for KeyProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound(id) => write!(f, "master key not found: {id}"),
            Self::NoDefaultKey => write!(f, "no default key configured"),
            Self::InvalidKey(msg) => write!(f, "invalid key material: {msg}"),
            Self::Unavailable(msg) => write!(f, "provider unavailable: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for KeyProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeyProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
