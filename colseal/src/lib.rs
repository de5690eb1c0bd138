//! # `colseal`
//!
//! Client-side column encryption with versioned keys and blind indexes.
//! Field values are encrypted before they reach the database; a
//! deterministic keyed hash per key version keeps exact-match search
//! possible on ciphertext, and key rotation works without downtime because
//! old versions stay decryptable and searchable while active.
//!
//! ## Features
//!
//! - XChaCha20-Poly1305 AEAD with per-version derived keys
//! - Authenticated inner key id (key-confusion defense)
//! - Blind indexes (HMAC-SHA256) per key version for equality search
//! - Key rotation with consistent re-indexing
//! - Optional zstd compression with bounded decompression
//! - Pluggable key providers (in-memory map, file-backed)
//!
//! ## Example
//!
//! ```rust,ignore
//! use colseal::prelude::*;
//!
//! let provider = FileKeyProvider::new("./keys")?;
//! let vault = CipherVault::new(&provider)?;
//!
//! let sealed = vault.seal_indexed(b"alice@example.com")?;
//! // persist sealed.ciphertext, sealed.blind_index, sealed.key_id
//! let plaintext = vault.open(&sealed.ciphertext)?;
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod blind_index;
pub mod cipher;
pub mod compress;
pub mod error;
pub mod kdf;
pub mod key_provider;
pub mod keyring;
pub mod rotation;
pub mod search;
pub mod wire;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::blind_index::{normalize, BlindIndexTag, BLIND_INDEX_SIZE};
    pub use crate::cipher::{CipherVault, SealedValue};
    pub use crate::compress::CompressionMode;
    pub use crate::error::{Error, KeyProviderError};
    pub use crate::key_provider::{KeyProvider, StaticKeyProvider};
    pub use crate::search::ColumnIdent;
}
