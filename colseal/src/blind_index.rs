//! Blind index generation for equality search over encrypted columns.
//!
//! A blind index is HMAC-SHA256 over the plaintext, keyed with the per-version
//! index key. It deliberately leaks equality (equal plaintexts under the same
//! key version produce equal tags) and nothing else; that leakage is what
//! makes `WHERE email_idx = ?` possible on ciphertext columns.
//!
//! Tags are computed per key version. While two key versions are active, a
//! value written under the old version is still findable by querying with
//! both tags; [`CipherVault::blind_index_all`] produces the full set.

use crate::cipher::CipherVault;
use crate::error::Error;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Blind index output size in bytes.
pub const BLIND_INDEX_SIZE: usize = 32;

/// Fixed-length deterministic search tag.
pub type BlindIndexTag = [u8; BLIND_INDEX_SIZE];

impl CipherVault {
    /// Computes the blind index of `value` under the key version `key_id`.
    ///
    /// Deterministic: the same value and key id always produce the same tag.
    /// Any normalization (case folding, trimming) must happen before this
    /// call, identically at write and search time, or lookups will silently
    /// miss; see [`normalize`](crate::blind_index::normalize).
    ///
    /// # Errors
    ///
    /// Returns `Error::UsedAfterTeardown` on a closed vault or
    /// `Error::KeyNotFound` for an inactive key id.
    pub fn blind_index(&self, key_id: &str, value: &[u8]) -> Result<BlindIndexTag, Error> {
        let ring = self.ring_checked()?;
        let key_set = ring.get(key_id)?;

        compute_tag(key_set.hmac_key().expose_secret(), value)
    }

    /// Computes the blind index of `value` under every active key version.
    ///
    /// Returns `(key_id, tag)` pairs sorted by key id, independent of any
    /// provider iteration order, so search predicates built from the result
    /// are deterministic across calls.
    ///
    /// # Errors
    ///
    /// Returns `Error::UsedAfterTeardown` on a closed vault.
    pub fn blind_index_all(&self, value: &[u8]) -> Result<Vec<(String, BlindIndexTag)>, Error> {
        let ring = self.ring_checked()?;

        ring.iter()
            .map(|(key_id, key_set)| -> Result<(String, BlindIndexTag), Error> {
                let tag = compute_tag(key_set.hmac_key().expose_secret(), value)?;
                Ok((key_id.to_string(), tag))
            })
            .collect()
    }
}

fn compute_tag(hmac_key: &[u8], value: &[u8]) -> Result<BlindIndexTag, Error> {
    let mut mac = HmacSha256::new_from_slice(hmac_key).map_err(|_| Error::KeyDerivation)?;
    mac.update(value);

    let mut tag = [0u8; BLIND_INDEX_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

pub mod normalize {
    //! Caller-side canonicalizers for blind-index input.
    //!
    //! The engine hashes exactly the bytes it is given. Apply the same
    //! normalizer when writing a row and when building a search predicate;
    //! mixing normalized writes with raw searches silently finds nothing.

    /// Trims surrounding whitespace and lowercases.
    #[must_use]
    pub fn trim_lowercase(value: &str) -> String {
        value.trim().to_lowercase()
    }

    /// Canonicalizes an email address: trim, lowercase.
    #[must_use]
    pub fn email(value: &str) -> String {
        trim_lowercase(value)
    }

    /// Canonicalizes a phone number: keeps a leading `+` and all digits,
    /// drops separators and whitespace.
    #[must_use]
    pub fn phone(value: &str) -> String {
        let trimmed = value.trim();
        let mut out = String::with_capacity(trimmed.len());
        for (i, ch) in trimmed.chars().enumerate() {
            if ch.is_ascii_digit() || (i == 0 && ch == '+') {
                out.push(ch);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_provider::StaticKeyProvider;
    use secrecy::SecretVec;

    fn vault() -> CipherVault {
        let provider = StaticKeyProvider::new(
            [
                ("v1".to_string(), SecretVec::new(vec![0u8; 32])),
                ("v2".to_string(), SecretVec::new(vec![1u8; 32])),
            ],
            "v1",
        )
        .unwrap();
        CipherVault::new(&provider).unwrap()
    }

    #[test]
    fn test_blind_index_deterministic() {
        let vault = vault();

        let tag1 = vault.blind_index("v1", b"alice@example.com").unwrap();
        let tag2 = vault.blind_index("v1", b"alice@example.com").unwrap();

        assert_eq!(tag1, tag2);
        assert_eq!(tag1.len(), BLIND_INDEX_SIZE);
    }

    #[test]
    fn test_blind_index_differs_per_value() {
        let vault = vault();

        let tag1 = vault.blind_index("v1", b"alice@example.com").unwrap();
        let tag2 = vault.blind_index("v1", b"bob@example.com").unwrap();

        assert_ne!(tag1, tag2);
    }

    #[test]
    fn test_blind_index_differs_per_key_version() {
        let vault = vault();

        let tag1 = vault.blind_index("v1", b"alice@example.com").unwrap();
        let tag2 = vault.blind_index("v2", b"alice@example.com").unwrap();

        assert_ne!(tag1, tag2);
    }

    #[test]
    fn test_blind_index_unknown_key() {
        let vault = vault();
        let result = vault.blind_index("v9", b"x");

        assert!(matches!(result, Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn test_blind_index_all_sorted_and_complete() {
        let vault = vault();
        let tags = vault.blind_index_all(b"alice@example.com").unwrap();

        let ids: Vec<&str> = tags.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);

        for (key_id, tag) in &tags {
            assert_eq!(*tag, vault.blind_index(key_id, b"alice@example.com").unwrap());
        }
    }

    #[test]
    fn test_blind_index_after_teardown() {
        let vault = vault();
        vault.close();

        assert!(matches!(
            vault.blind_index("v1", b"x"),
            Err(Error::UsedAfterTeardown)
        ));
        assert!(matches!(vault.blind_index_all(b"x"), Err(Error::UsedAfterTeardown)));
    }

    #[test]
    fn test_blind_index_empty_value() {
        let vault = vault();
        let tag = vault.blind_index("v1", b"").unwrap();
        assert_eq!(tag.len(), BLIND_INDEX_SIZE);
    }

    #[test]
    fn test_email_normalization_once_consistently() {
        let vault = vault();

        let written = vault
            .blind_index("v1", normalize::email("Alice@Example.com").as_bytes())
            .unwrap();
        let searched = vault.blind_index("v1", b"alice@example.com").unwrap();

        assert_eq!(written, searched);
    }

    #[test]
    fn test_normalizers() {
        assert_eq!(normalize::trim_lowercase("  MiXeD Case  "), "mixed case");
        assert_eq!(normalize::email(" Bob@Example.COM "), "bob@example.com");
        assert_eq!(normalize::phone(" +1 (555) 123-4567 "), "+15551234567");
        assert_eq!(normalize::phone("555 123 4567"), "5551234567");
    }
}
