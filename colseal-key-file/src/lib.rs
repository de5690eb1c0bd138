//! File-based key provider for `colseal`.
//!
//! This provider stores master keys in the filesystem and is suitable for
//! development and testing environments.

#![warn(clippy::pedantic, clippy::nursery)]

use colseal::error::KeyProviderError;
use colseal::key_provider::KeyProvider;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretVec;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Master key size written to disk, matching the engine's requirement.
const KEY_SIZE: usize = 32;

/// Extension for key files.
const KEY_EXT: &str = "key";

/// Name of the file holding the default key id.
const DEFAULT_FILE: &str = "default";

/// File-based key provider for development and testing.
///
/// Keys are stored in the filesystem with the following structure:
/// ```text
/// keys/
/// ├── v1.key      (32 raw bytes)
/// ├── v2.key      (32 raw bytes)
/// └── default     (text file naming the active key id, e.g. "v2")
/// ```
///
/// Key ids accepted on this surface are restricted to
/// `[A-Za-z0-9_-]{1,64}` so an id can never escape the key directory.
pub struct FileKeyProvider {
    key_dir: PathBuf,
}

impl FileKeyProvider {
    /// Creates a provider over an existing key directory.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::Unavailable` if the directory does not
    /// exist.
    pub fn new(key_dir: impl Into<PathBuf>) -> Result<Self, KeyProviderError> {
        let key_dir = key_dir.into();
        if !key_dir.is_dir() {
            return Err(KeyProviderError::Unavailable(format!(
                "key directory does not exist: {}",
                key_dir.display()
            )));
        }
        Ok(Self { key_dir })
    }

    /// Initializes a key directory with a fresh random `v1` key as default.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or key generation fails.
    pub fn init(key_dir: impl Into<PathBuf>) -> Result<Self, KeyProviderError> {
        let key_dir = key_dir.into();
        fs::create_dir_all(&key_dir)?;

        let provider = Self { key_dir };
        provider.add_key("v1")?;
        provider.set_default("v1")?;
        Ok(provider)
    }

    /// Generates and stores a fresh random master key under `key_id`.
    ///
    /// The new key becomes active immediately but is not made the default;
    /// call [`FileKeyProvider::set_default`] to switch new encryptions over.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::InvalidKey` for a bad id or if the id is
    /// already in use, or an I/O error if the write fails.
    pub fn add_key(&self, key_id: &str) -> Result<(), KeyProviderError> {
        let path = self.key_path(key_id)?;
        if path.exists() {
            return Err(KeyProviderError::InvalidKey(format!("key id already in use: {key_id}")));
        }

        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        let result = fs::write(&path, key);
        key.zeroize();
        result?;

        Ok(())
    }

    /// Makes `key_id` the default for new encryptions.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::KeyNotFound` if no such key is stored.
    pub fn set_default(&self, key_id: &str) -> Result<(), KeyProviderError> {
        let path = self.key_path(key_id)?;
        if !path.exists() {
            return Err(KeyProviderError::KeyNotFound(key_id.to_string()));
        }

        fs::write(self.key_dir.join(DEFAULT_FILE), key_id)?;
        Ok(())
    }

    fn key_path(&self, key_id: &str) -> Result<PathBuf, KeyProviderError> {
        if !is_valid_key_id(key_id) {
            return Err(KeyProviderError::InvalidKey(format!("invalid key id: {key_id:?}")));
        }
        Ok(self.key_dir.join(format!("{key_id}.{KEY_EXT}")))
    }
}

fn is_valid_key_id(key_id: &str) -> bool {
    !key_id.is_empty()
        && key_id.len() <= 64
        && key_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn read_key_file(path: &Path) -> Result<SecretVec<u8>, KeyProviderError> {
    let bytes = fs::read(path)?;
    if bytes.len() != KEY_SIZE {
        return Err(KeyProviderError::InvalidKey(format!(
            "{}: expected {KEY_SIZE} bytes, found {}",
            path.display(),
            bytes.len()
        )));
    }
    Ok(SecretVec::new(bytes))
}

impl KeyProvider for FileKeyProvider {
    fn get_key(&self, key_id: &str) -> Result<SecretVec<u8>, KeyProviderError> {
        let path = self.key_path(key_id)?;
        if !path.exists() {
            return Err(KeyProviderError::KeyNotFound(key_id.to_string()));
        }
        read_key_file(&path)
    }

    fn default_key_id(&self) -> Result<String, KeyProviderError> {
        let path = self.key_dir.join(DEFAULT_FILE);
        if !path.exists() {
            return Err(KeyProviderError::NoDefaultKey);
        }
        let contents = fs::read_to_string(path)?;
        let key_id = contents.trim();
        if key_id.is_empty() {
            return Err(KeyProviderError::NoDefaultKey);
        }
        Ok(key_id.to_string())
    }

    fn active_key_ids(&self) -> Result<Vec<String>, KeyProviderError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.key_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(KEY_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}
